use std::io;
use thiserror::Error;

/// Failures raised by a store or one of its sessions.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },
    #[error("Unknown row {id} in table {table}")]
    UnknownRow { table: String, id: i64 },
    #[error("Column {column} already exists in table {table}")]
    DuplicateColumn { table: String, column: String },
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Audit log error: {0}")]
    Audit(String),
    #[error("Database {0} is not initialized (schema version 0)")]
    Uninitialized(String),
}

/// Failures surfaced by `MigrationEngine::upgrade` and registry construction.
///
/// None of these are retried by the engine. Every variant leaves the store at
/// its pre-call version with no partial effects.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("downgrade not supported: store is at version {current}, requested {target}")]
    DowngradeNotSupported { current: u32, target: u32 },
    #[error("missing upgrade path: no registered step starts at version {0}")]
    MissingUpgradePath(u32),
    #[error("conflicting upgrade steps: more than one step covers version {0}")]
    ConflictingUpgradeSteps(u32),
    #[error("invalid upgrade step range {from} -> {to}")]
    InvalidStepRange { from: u32, to: u32 },
    #[error("upgrade step {from} -> {to} ({description}) failed: {cause}")]
    StepFailed {
        from: u32,
        to: u32,
        description: &'static str,
        #[source]
        cause: StoreError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MigrationError {
    /// True for the registry/path configuration class of errors, which are
    /// always detected before the store is touched.
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            Self::MissingUpgradePath(_)
                | Self::ConflictingUpgradeSteps(_)
                | Self::InvalidStepRange { .. }
        )
    }
}
