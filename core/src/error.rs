//! Shared error type for erm.
//!
//! Every crate boundary in the workspace converts its local failures into
//! [`ErmError`] (directly or via `#[from]`) rather than inventing a parallel
//! taxonomy per crate, mirroring the single-error-enum-per-boundary
//! convention the teacher workspace used for `DrizzleError`.

use thiserror::Error;

/// Top-level error taxonomy for erm. Variants correspond to the error kinds
/// named in the specification's error handling design (schema discovery,
/// schema drift, migration SQL, validation, generator write, invalid
/// invocation), not to Rust types — several subsystems construct the same
/// variant.
#[derive(Debug, Error)]
pub enum ErmError {
    /// Parse/resolution failure while loading entity definitions.
    /// `suggestion` names the offending entity/method when known.
    #[error("schema discovery error: {message}")]
    SchemaDiscovery {
        message: String,
        suggestion: Option<String>,
    },

    /// An applied migration version has no matching forward file.
    #[error("schema drift: applied versions with no forward file: {missing:?}")]
    SchemaDrift { missing: Vec<String> },

    /// Migration SQL failure, optionally decorated with `<path>:<line>:<col>`.
    #[error("migration SQL error{}: {message}", position.as_deref().map(|p| format!(" at {p}")).unwrap_or_default())]
    MigrationSql {
        message: String,
        position: Option<String>,
    },

    /// No migrations have been applied; rollback has nothing to undo.
    #[error("no applied migrations to roll back")]
    NoAppliedMigrations,

    /// A recorded version has no matching down/rollback file.
    #[error("missing down file for version {version}")]
    MissingDownFile { version: String },

    /// A forward migration version is duplicated within a directory.
    #[error("duplicate migration version: {version}")]
    DuplicateVersion { version: String },

    /// Aggregated field errors from the validation registry.
    #[error("validation failed: {} error(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// File I/O failure while emitting generated artifacts.
    #[error("write error at {path}: {message}")]
    GeneratorWrite {
        path: String,
        message: String,
        suggestion: Option<String>,
    },

    /// A configuration or flag combination is nonsensical (e.g. `diff`
    /// without `dry-run`, `watch` with `dry-run`).
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("{0}")]
    Other(String),
}

/// A single field-scoped validation failure, per spec §4.8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, ErmError>;

impl ErmError {
    pub fn schema_discovery(entity: &str, method: &str, detail: impl Into<String>) -> Self {
        ErmError::SchemaDiscovery {
            message: detail.into(),
            suggestion: Some(format!("check `{entity}.{method}(...)`")),
        }
    }

    pub fn generator_write(path: impl Into<String>, detail: impl Into<String>) -> Self {
        ErmError::GeneratorWrite {
            path: path.into(),
            message: detail.into(),
            suggestion: Some("check the output path is writable".to_string()),
        }
    }
}
