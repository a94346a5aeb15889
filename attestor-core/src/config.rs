//! Coordinator configuration.
//!
//! Network-specific constants are never read from ambient global state: the
//! coordinator receives one explicit configuration struct at construction
//! time, validated up front.

use crate::capability::ProxyBinding;
use crate::error::{AttestorResult, ConfigError};
use crate::identity::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for transient ledger failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt. State-changing calls require at
    /// least 3 before a transient failure is escalated.
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Policy used when the operator does not override one.
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Master configuration for a migration/upgrade run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Governance contract holding the role registry.
    pub governance: Address,
    /// The attribute store proxy (stable address; logic behind it may move).
    pub store: Address,
    /// Identity submitting state-changing calls. Must hold the governance
    /// capability; checked before acting, fail closed.
    pub identity: Address,
    /// Accounts per migration call.
    pub chunk_size: u64,
    /// Blocks per discovery sub-range.
    pub scan_step: u64,
    /// How long to wait for inclusion of one call before treating the wait
    /// as a transient failure.
    pub confirmation_timeout: Duration,
    pub retry: RetryConfig,
}

impl CoordinatorConfig {
    /// Validate the configuration.
    ///
    /// Rejects zero addresses, zero chunk size or scan step, and degenerate
    /// retry/timeout values.
    pub fn validate(&self) -> AttestorResult<()> {
        if self.governance.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "governance",
                reason: "must not be the zero address".to_string(),
            }
            .into());
        }
        if self.store.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "store",
                reason: "must not be the zero address".to_string(),
            }
            .into());
        }
        if self.identity.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "identity",
                reason: "must not be the zero address".to_string(),
            }
            .into());
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_size",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.scan_step == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan_step",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.confirmation_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "confirmation_timeout",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.retry.max_retries < 3 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_retries",
                reason: "state-changing calls require at least 3 retries".to_string(),
            }
            .into());
        }
        if self.retry.initial_backoff.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "retry.initial_backoff",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.retry.max_backoff < self.retry.initial_backoff {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_backoff",
                reason: "must be at least initial_backoff".to_string(),
            }
            .into());
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.backoff_multiplier",
                reason: "must be at least 1.0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The store proxy binding with its currently expected logic address.
    pub fn binding(&self, logic: Address) -> ProxyBinding {
        ProxyBinding::new(self.store, logic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> CoordinatorConfig {
        CoordinatorConfig {
            governance: Address::derived("governance"),
            store: Address::derived("store-proxy"),
            identity: Address::derived("operator"),
            chunk_size: 5,
            scan_step: 1_000,
            confirmation_timeout: Duration::from_secs(60),
            retry: RetryConfig::standard(),
        }
    }

    #[test]
    fn test_base_config_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let mut config = base_config();
        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_identity() {
        let mut config = base_config();
        config.identity = Address::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_insufficient_retry_budget() {
        let mut config = base_config();
        config.retry.max_retries = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_backoff_ceiling_below_floor() {
        let mut config = base_config();
        config.retry.max_backoff = Duration::from_millis(1);
        assert!(config.validate().is_err());
    }
}
