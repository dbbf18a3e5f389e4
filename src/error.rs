//! Front-door errors.
//!
//! `CliError` wraps the pipeline's [`RenameError`] together with the failures
//! that only exist at the command line: configuration and argument parsing.
//! Every variant maps to a stable [`OutputErrorCode`], which is also the
//! process exit status.

use thiserror::Error;

use ngrename_core::error::{OutputErrorCode, RenameError};
use ngrename_core::workspace::WorkspaceError;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rename(#[from] RenameError),

    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },
}

impl CliError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        CliError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> OutputErrorCode {
        match self {
            CliError::Config(_) | CliError::InvalidArguments { .. } => {
                OutputErrorCode::InvalidArguments
            }
            CliError::Rename(err) => err.error_code(),
        }
    }
}

impl From<WorkspaceError> for CliError {
    fn from(err: WorkspaceError) -> Self {
        CliError::Rename(err.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Rename(err.into())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let config = CliError::from(ConfigError::Parse {
            path: ".ngrename.toml".to_string(),
            message: "expected a table".to_string(),
        });
        assert_eq!(config.error_code().code(), 2);
        assert_eq!(CliError::invalid_args("bad location").error_code().code(), 2);

        let missing = CliError::from(RenameError::SymbolNotFound {
            target: "a.ts:1:1".to_string(),
        });
        assert_eq!(missing.error_code().code(), 3);

        let denied = CliError::from(RenameError::ConfirmationDenied {
            reason: "no".to_string(),
        });
        assert_eq!(denied.error_code().code(), 5);

        let io = CliError::from(std::io::Error::other("disk full"));
        assert_eq!(io.error_code().code(), 10);
    }

    #[test]
    fn messages_pass_through() {
        let err = CliError::from(RenameError::FileNotFound {
            path: "src/app/x.ts".to_string(),
        });
        assert_eq!(err.to_string(), "file not found: src/app/x.ts");
    }
}
