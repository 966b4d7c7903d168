//! CLI-local error type and the exit-code mapping (0 success, 1 runtime
//! failure, 2 invalid invocation) per spec §6.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Erm(#[from] erm_core::ErmError),

    #[error("config error at {path}: {message}")]
    Config { path: String, message: String },

    #[error("{0}")]
    InvalidInvocation(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Exit status per spec §6: invalid invocation is a distinct code from
    /// every other runtime failure so scripts can tell "you used it wrong"
    /// apart from "it ran and failed".
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidInvocation(_) => 2,
            CliError::Config { .. } => 2,
            CliError::Erm(erm_core::ErmError::InvalidInvocation(_)) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_invocation_maps_to_exit_code_two() {
        let err = CliError::InvalidInvocation("no schema files found under schema/".to_string());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn erm_invalid_invocation_maps_to_exit_code_two() {
        let err = CliError::Erm(erm_core::ErmError::InvalidInvocation(
            "bulk insert requires at least one row".to_string(),
        ));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn config_error_maps_to_exit_code_two() {
        let err = CliError::Config { path: "erm.toml".to_string(), message: "bad toml".to_string() };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn database_error_maps_to_exit_code_one() {
        let err = CliError::Erm(erm_core::ErmError::Database("connection refused".to_string()));
        assert_eq!(err.exit_code(), 1);
    }
}
