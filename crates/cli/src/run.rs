//! Pipeline execution: load, join groups, add externals, backfill,
//! suppress, group into households, project, export.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use rollcall_core::{
    project_index, reconcile, CoreError, HouseholdIndex, PipelineConfig, Roster,
};
use rollcall_io::{load_table, IoError};

use crate::exit_codes::{
    EXIT_INPUT_FORMAT, EXIT_INVALID_CONFIG, EXIT_INVARIANT, EXIT_RUNTIME,
};
use crate::export;
use crate::CliError;

/// Tag carried by everyone from the primary snapshot.
pub const TAG_BASE_MEMBER: &str = "base-member";
/// Tag for newsletter recipients who are not registry members.
pub const TAG_EXTERNAL_RECIPIENT: &str = "external-recipient";

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub records: usize,
    pub group_memberships: usize,
    pub backfilled: usize,
    pub lost_contacts: usize,
    pub suppressed: usize,
    pub households: usize,
    pub no_email_members: usize,
    pub projected_rows: usize,
}

pub fn cmd_run(config_path: &Path, json: bool) -> Result<(), CliError> {
    let config = read_config(config_path)?;
    // Source paths resolve relative to the config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let summary = execute(&config, base_dir)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary)
                .map_err(|e| runtime(format!("cannot serialize summary: {e}")))?
        );
    } else {
        println!("{}: {} records in {} households", summary.name, summary.records, summary.households);
        println!(
            "  groups {}  backfilled {}  lost {}  suppressed {}  no-email {}  rows {}",
            summary.group_memberships,
            summary.backfilled,
            summary.lost_contacts,
            summary.suppressed,
            summary.no_email_members,
            summary.projected_rows,
        );
    }
    Ok(())
}

pub fn cmd_validate(config_path: &Path) -> Result<(), CliError> {
    let config = read_config(config_path)?;
    println!(
        "config '{}' ok: {} category columns, backfill {}, suppression {}",
        config.name,
        config.projection.categories.len(),
        config.backfill.as_ref().map(|b| b.field.to_string()).unwrap_or_else(|| "off".into()),
        config.suppress.as_ref().map(|s| s.field.to_string()).unwrap_or_else(|| "off".into()),
    );
    Ok(())
}

fn read_config(config_path: &Path) -> Result<PipelineConfig, CliError> {
    let content = std::fs::read_to_string(config_path)
        .map_err(|e| runtime(format!("cannot read config: {e}")))?;
    PipelineConfig::from_toml(&content).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: e.to_string(),
        hint: None,
    })
}

fn runtime(message: String) -> CliError {
    CliError { code: EXIT_RUNTIME, message, hint: None }
}

fn load_err(err: IoError) -> CliError {
    let code = match err {
        IoError::Read { .. } => EXIT_RUNTIME,
        _ => EXIT_INPUT_FORMAT,
    };
    CliError { code, message: err.to_string(), hint: None }
}

/// Core errors raised while mapping input rows are input errors; the rest
/// indicate defects and map to the invariant exit code.
fn data_err(err: CoreError) -> CliError {
    let code = match err {
        CoreError::MissingColumn { .. }
        | CoreError::DateParse { .. }
        | CoreError::NumberParse { .. }
        | CoreError::Csv(_) => EXIT_INPUT_FORMAT,
        _ => EXIT_INVARIANT,
    };
    CliError { code, message: err.to_string(), hint: None }
}

fn invariant_err(err: CoreError) -> CliError {
    CliError { code: EXIT_INVARIANT, message: err.to_string(), hint: None }
}

pub fn execute(config: &PipelineConfig, base_dir: &Path) -> Result<RunSummary, CliError> {
    // Primary snapshot
    let table = load_table(&base_dir.join(&config.sources.members)).map_err(load_err)?;
    let mut roster = Roster::from_table(&table, &config.fields).map_err(data_err)?;
    roster.annotate_all(TAG_BASE_MEMBER);
    info!(records = roster.len(), "loaded member snapshot");

    // Group roster join
    let mut group_memberships = 0;
    if let (Some(source), Some(map)) = (&config.sources.groups, &config.groups) {
        let table = load_table(&base_dir.join(source)).map_err(load_err)?;
        group_memberships = roster.apply_groups(&table, map).map_err(data_err)?;
        info!(memberships = group_memberships, "joined group roster");
    }

    // Additional recipients
    if let Some(source) = &config.sources.additional {
        let table = load_table(&base_dir.join(source)).map_err(load_err)?;
        let additional = Roster::from_table(&table, &config.fields).map_err(data_err)?;
        let tags: BTreeSet<String> =
            [TAG_EXTERNAL_RECIPIENT.to_string()].into_iter().collect();
        info!(records = additional.len(), "adding external recipients");
        roster.add(additional.records().to_vec(), Some(&tags));
    }

    // Backfill pass. An unavailable backup snapshot is logged and the pass
    // skipped; the run proceeds with what it has.
    let mut backfilled = 0;
    let mut lost_contacts = 0;
    if let Some(backfill_config) = &config.backfill {
        if let Some(path) = available_source(&config.sources.backup, base_dir) {
            let table = load_table(&path).map_err(load_err)?;
            let backup = Roster::from_table(&table, &config.fields).map_err(data_err)?;
            let missing = reconcile::missing_indices(&roster, backfill_config.field);
            backfilled = reconcile::backfill(
                &mut roster,
                backfill_config.field,
                &backup,
                &backfill_config.exclude,
            )
            .map_err(invariant_err)?;
            let recovered = reconcile::recovered(&roster, backfill_config.field, &missing);
            for record in &recovered {
                warn!(
                    member = %record.display_name(),
                    field = %backfill_config.field,
                    "current export lost a value present in the backup"
                );
            }
            lost_contacts = recovered.len();
        }
    }

    // Suppression pass, after backfill so recovered values are still
    // suppressed. Same soft behavior for a missing removal list.
    let mut suppressed = 0;
    if let Some(suppress_config) = &config.suppress {
        if let Some(path) = available_source(&config.sources.removals, base_dir) {
            let table = load_table(&path).map_err(load_err)?;
            let removals = Roster::from_table(&table, &config.fields).map_err(data_err)?;
            suppressed = reconcile::suppress(&mut roster, suppress_config.field, &removals);
        }
    }

    // Households
    let index = HouseholdIndex::group(&roster).map_err(invariant_err)?;
    let no_email_members = index
        .no_email_household()
        .map_err(invariant_err)?
        .map(|h| h.len())
        .unwrap_or(0);

    // Projection + exports
    let rows = project_index(&index, &config.projection);
    if let Some(path) = &config.output.households {
        export::write_household_rows(
            &base_dir.join(path),
            &rows,
            &config.projection,
            config.output_delimiter(),
        )?;
    }
    if let Some(path) = &config.output.no_email {
        let members = index
            .no_email_household()
            .map_err(invariant_err)?
            .map(|h| h.members())
            .unwrap_or(&[]);
        export::write_address_rows(&base_dir.join(path), members, config.output_delimiter())?;
    }

    let summary = RunSummary {
        name: config.name.clone(),
        records: roster.len(),
        group_memberships,
        backfilled,
        lost_contacts,
        suppressed,
        households: index.len(),
        no_email_members,
        projected_rows: rows.len(),
    };
    if let Some(path) = &config.output.summary {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| runtime(format!("cannot serialize summary: {e}")))?;
        std::fs::write(base_dir.join(path), json)
            .map_err(|e| runtime(format!("cannot write summary: {e}")))?;
    }
    Ok(summary)
}

fn available_source(source: &Option<String>, base_dir: &Path) -> Option<PathBuf> {
    let source = source.as_ref()?;
    let path = base_dir.join(source);
    if path.exists() {
        Some(path)
    } else {
        warn!(path = %path.display(), "reference snapshot unavailable, pass skipped");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PIPELINE_TOML: &str = r#"
name = "newsletter"

[sources]
members = "members.csv"
additional = "additional.csv"
backup = "backup.csv"
removals = "removals.csv"

[fields]
first_name = "Vorname"
last_name = "Nachname"
gender = "Geschlecht"
emails = ["E-Mail"]
category = "Kategorie"

[backfill]
field = "email"
exclude = ["category", "tags", "groups_member", "groups_coach"]

[suppress]
field = "email"

[output]
households = "OUT/households.csv"
no_email = "OUT/no_email.csv"
summary = "OUT/summary.json"

[[projection.categories]]
label = "Aktive Turner"
source = "Aktive Turner"

[[projection.categories]]
label = "Aktive Turnerin"
source = "Aktive Turnerin"

[[projection.categories]]
label = "Passivmitglied"
source = "Passivmitglied"
"#;

    const MEMBERS_CSV: &str = "\
Vorname;Nachname;Geschlecht;E-Mail;Kategorie
Ann;Lee;Weiblich;family@x.com;Aktive Turnerin
Ben;Lee;Männlich;family@x.com;Aktive Turner
Cleo;Ray;Weiblich;;Aktive Turnerin
Dan;Poe;Männlich;dan@x.com;Passivmitglied
";

    // Cleo's email disappeared from the current export; the backup still
    // carries it.
    const BACKUP_CSV: &str = "\
Vorname;Nachname;Geschlecht;E-Mail;Kategorie
Cleo;Ray;Weiblich;cleo@x.com;Aktive Turnerin
";

    const REMOVALS_CSV: &str = "\
Vorname;Nachname;Geschlecht;E-Mail;Kategorie
;;;dan@x.com;
";

    const ADDITIONAL_CSV: &str = "\
Vorname;Nachname;Geschlecht;E-Mail;Kategorie
Eve;Fox;Weiblich;eve@elsewhere.org;
";

    fn write_inputs(dir: &Path) {
        fs::write(dir.join("members.csv"), MEMBERS_CSV).unwrap();
        fs::write(dir.join("backup.csv"), BACKUP_CSV).unwrap();
        fs::write(dir.join("removals.csv"), REMOVALS_CSV).unwrap();
        fs::write(dir.join("additional.csv"), ADDITIONAL_CSV).unwrap();
    }

    #[test]
    fn full_pipeline_run() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let config = PipelineConfig::from_toml(PIPELINE_TOML).unwrap();

        let summary = execute(&config, dir.path()).unwrap();
        assert_eq!(summary.records, 5);
        assert_eq!(summary.backfilled, 1);
        assert_eq!(summary.lost_contacts, 1);
        assert_eq!(summary.suppressed, 1);
        // family@x.com, cleo@x.com, eve@elsewhere.org, and Dan without mail
        assert_eq!(summary.households, 4);
        assert_eq!(summary.no_email_members, 1);
        assert_eq!(summary.projected_rows, 3);

        let households = fs::read_to_string(dir.path().join("OUT/households.csv")).unwrap();
        let mut lines = households.lines();
        assert_eq!(
            lines.next().unwrap(),
            "first_names;last_names;email;male;female;Aktive Turner;Aktive Turnerin;Passivmitglied"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Ann & Ben;Lee;family@x.com;1;1;1;1;0"
        );

        let no_email = fs::read_to_string(dir.path().join("OUT/no_email.csv")).unwrap();
        assert!(no_email.lines().any(|l| l.starts_with("Dan;Poe")));

        let summary_json = fs::read_to_string(dir.path().join("OUT/summary.json")).unwrap();
        assert!(summary_json.contains("\"records\": 5"));
    }

    #[test]
    fn missing_backup_skips_the_pass() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        fs::remove_file(dir.path().join("backup.csv")).unwrap();
        let config = PipelineConfig::from_toml(PIPELINE_TOML).unwrap();

        let summary = execute(&config, dir.path()).unwrap();
        assert_eq!(summary.backfilled, 0);
        // Cleo keeps her absent email and lands in the no-email household
        assert_eq!(summary.no_email_members, 2);
    }

    #[test]
    fn unrecognized_member_format_aborts() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let config = PipelineConfig::from_toml(
            &PIPELINE_TOML.replace("members = \"members.csv\"", "members = \"members.pdf\""),
        )
        .unwrap();
        fs::write(dir.path().join("members.pdf"), "not tabular").unwrap();

        let err = execute(&config, dir.path()).unwrap_err();
        assert_eq!(err.code, EXIT_INPUT_FORMAT);
    }
}
