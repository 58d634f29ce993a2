//! Stable exit codes for scripting against the pipeline.

/// Pipeline config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 2;
/// An input snapshot had an unrecognized or unparseable format.
pub const EXIT_INPUT_FORMAT: u8 = 3;
/// A grouping invariant was violated (defect, not bad input).
pub const EXIT_INVARIANT: u8 = 4;
/// Filesystem or output error.
pub const EXIT_RUNTIME: u8 = 5;
