//! `rollcall-core` — membership-roster reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tabular snapshots, reconciles
//! them into one roster, groups it into email-keyed households and
//! projects per-household category flags. No file IO or CLI dependencies.

pub mod config;
pub mod error;
pub mod field;
pub mod household;
pub mod project;
pub mod reconcile;
pub mod record;
pub mod roster;
pub mod table;

pub use config::{FieldMap, GroupMap, PipelineConfig, ProjectionSchema};
pub use error::CoreError;
pub use field::{Cmp, Field, Value};
pub use household::{Household, HouseholdIndex};
pub use project::{project, project_index, HouseholdRow};
pub use record::{Gender, Record};
pub use roster::Roster;
pub use table::{Cell, Table};
