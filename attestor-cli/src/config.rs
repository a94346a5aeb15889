//! Configuration loading for the Attestor CLI.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use crate::error::CliError;
use attestor_core::{Address, BlockRange, CoordinatorConfig, RetryConfig, Word};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    pub rpc_endpoint: String,
    pub request_timeout_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub governance: Address,
    pub store: Address,
    pub identity: Address,
    pub start_block: u64,
    pub end_block: u64,
    pub chunk_size: u64,
    pub scan_step: u64,
    pub checkpoint_path: PathBuf,
    pub snapshot_path: PathBuf,
    /// Logic artifact to bind on `upgrade`; unused by other commands.
    pub new_logic: Option<Address>,
    /// Storage slots verified byte-identical across an upgrade.
    #[serde(default)]
    pub declared_slots: Vec<Word>,
    pub retry: RetryTable,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryTable {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl CliConfig {
    pub fn load(path_override: Option<PathBuf>) -> Result<Self, CliError> {
        let path = path_override
            .or_else(config_path_from_env)
            .ok_or(CliError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if self.rpc_endpoint.trim().is_empty() {
            return Err(CliError::InvalidValue {
                field: "rpc_endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(CliError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.checkpoint_path.as_os_str().is_empty() {
            return Err(CliError::InvalidValue {
                field: "checkpoint_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(CliError::InvalidValue {
                field: "snapshot_path",
                reason: "must not be empty".to_string(),
            });
        }
        self.sweep_range()?;
        self.coordinator()?.validate().map_err(CliError::from)?;
        Ok(())
    }

    /// The sweep range `[start_block, end_block)`.
    pub fn sweep_range(&self) -> Result<BlockRange, CliError> {
        BlockRange::new(self.start_block, self.end_block).map_err(|err| CliError::InvalidValue {
            field: "start_block/end_block",
            reason: err.to_string(),
        })
    }

    /// Translate into the coordinator's construction-time config.
    pub fn coordinator(&self) -> Result<CoordinatorConfig, CliError> {
        Ok(CoordinatorConfig {
            governance: self.governance,
            store: self.store,
            identity: self.identity,
            chunk_size: self.chunk_size,
            scan_step: self.scan_step,
            confirmation_timeout: Duration::from_millis(self.confirmation_timeout_ms),
            retry: RetryConfig {
                max_retries: self.retry.max_retries,
                initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
                backoff_multiplier: self.retry.backoff_multiplier,
            },
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var_os("ATTESTOR_CONFIG").map(PathBuf::from)
}
