use serde::Deserialize;

use crate::error::CoreError;
use crate::field::Field;

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// Maps source column names onto record attributes. The mapping is an
/// external configuration artifact: registry exports rename columns
/// between backend versions, the engine does not.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMap {
    #[serde(default)]
    pub member_number: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub plz: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    /// Candidate email columns in priority order.
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date_added: Option<String>,
    #[serde(default)]
    pub phone_private: Option<String>,
    #[serde(default)]
    pub phone_mobile: Option<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_date_format() -> String {
    "%d.%m.%Y".to_string()
}

impl FieldMap {
    pub fn from_toml(content: &str) -> Result<FieldMap, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::ConfigParse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Group roster mapping
// ---------------------------------------------------------------------------

/// Column mapping for the group-roster export joined onto members.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupMap {
    pub member_number: String,
    pub group: String,
    pub role: String,
    #[serde(default = "default_member_label")]
    pub member_label: String,
    #[serde(default = "default_coach_label")]
    pub coach_label: String,
}

fn default_member_label() -> String {
    "member".to_string()
}

fn default_coach_label() -> String {
    "coach".to_string()
}

// ---------------------------------------------------------------------------
// Projection schema
// ---------------------------------------------------------------------------

/// The report's category columns: ordered canonical labels plus the raw
/// source category string each one translates.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionSchema {
    pub categories: Vec<CategoryColumn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryColumn {
    /// Canonical report label.
    pub label: String,
    /// Source category string that maps to it.
    pub source: String,
}

impl ProjectionSchema {
    pub fn from_toml(content: &str) -> Result<ProjectionSchema, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.categories.is_empty() {
            return Err(CoreError::ConfigValidation(
                "projection schema has no category columns".into(),
            ));
        }
        for (i, column) in self.categories.iter().enumerate() {
            if self.categories[..i].iter().any(|c| c.label == column.label) {
                return Err(CoreError::ConfigValidation(format!(
                    "duplicate category label '{}'",
                    column.label
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Full pipeline description consumed by the driver: where the snapshots
/// live, how their columns map, which passes run, what gets written.
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub sources: Sources,
    pub fields: FieldMap,
    #[serde(default)]
    pub groups: Option<GroupMap>,
    pub projection: ProjectionSchema,
    #[serde(default)]
    pub backfill: Option<BackfillConfig>,
    #[serde(default)]
    pub suppress: Option<SuppressConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct Sources {
    /// Primary membership snapshot. Required; everything else is optional.
    pub members: String,
    #[serde(default)]
    pub groups: Option<String>,
    #[serde(default)]
    pub additional: Option<String>,
    #[serde(default)]
    pub backup: Option<String>,
    #[serde(default)]
    pub removals: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackfillConfig {
    pub field: Field,
    #[serde(default)]
    pub exclude: Vec<Field>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuppressConfig {
    pub field: Field,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub households: Option<String>,
    #[serde(default)]
    pub no_email: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_delimiter() -> String {
    ";".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            households: None,
            no_email: None,
            summary: None,
            delimiter: default_delimiter(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(content: &str) -> Result<PipelineConfig, CoreError> {
        let config: PipelineConfig =
            toml::from_str(content).map_err(|e| CoreError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.projection.validate()?;
        if let Some(ref backfill) = self.backfill {
            if backfill.field == Field::Tags {
                return Err(CoreError::ConfigValidation(
                    "tags are annotations, not source data; they cannot be backfilled".into(),
                ));
            }
            if self.sources.backup.is_none() {
                return Err(CoreError::ConfigValidation(
                    "backfill configured but no backup source given".into(),
                ));
            }
        }
        if let Some(ref suppress) = self.suppress {
            if suppress.field == Field::Tags {
                return Err(CoreError::ConfigValidation(
                    "tags are annotations, not source data; they cannot be suppressed".into(),
                ));
            }
            if self.sources.removals.is_none() {
                return Err(CoreError::ConfigValidation(
                    "suppression configured but no removals source given".into(),
                ));
            }
        }
        if let (Some(_), None) = (&self.sources.groups, &self.groups) {
            return Err(CoreError::ConfigValidation(
                "groups source given but no group column mapping".into(),
            ));
        }
        if self.output.delimiter.len() != 1 || !self.output.delimiter.is_ascii() {
            return Err(CoreError::ConfigValidation(format!(
                "output delimiter must be a single ASCII character, got '{}'",
                self.output.delimiter
            )));
        }
        Ok(())
    }

    pub fn output_delimiter(&self) -> u8 {
        self.output.delimiter.as_bytes()[0]
    }
}
