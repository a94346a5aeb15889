//! CLI error type.

use attestor_core::AttestorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Usage: attestor <migrate|upgrade|snapshot|verify> [--config <path>]")]
    Usage,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing configuration file path (use --config or ATTESTOR_CONFIG)")]
    MissingConfigPath,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Command `upgrade` requires new_logic in the config")]
    MissingNewLogic,

    #[error("No snapshot at {path}; run `attestor snapshot` before the upgrade")]
    MissingSnapshot { path: String },

    #[error(transparent)]
    Attestor(#[from] AttestorError),
}

impl From<attestor_core::LedgerError> for CliError {
    fn from(err: attestor_core::LedgerError) -> Self {
        CliError::Attestor(err.into())
    }
}

impl From<attestor_core::MigrationError> for CliError {
    fn from(err: attestor_core::MigrationError) -> Self {
        CliError::Attestor(err.into())
    }
}

impl From<attestor_core::UpgradeError> for CliError {
    fn from(err: attestor_core::UpgradeError) -> Self {
        CliError::Attestor(err.into())
    }
}

impl From<attestor_core::VerificationError> for CliError {
    fn from(err: attestor_core::VerificationError) -> Self {
        CliError::Attestor(err.into())
    }
}

impl From<attestor_core::CheckpointError> for CliError {
    fn from(err: attestor_core::CheckpointError) -> Self {
        CliError::Attestor(err.into())
    }
}
