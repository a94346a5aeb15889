//! Error taxonomy for coordinator operations.
//!
//! Read-path failures are transient and may be retried transparently. Any
//! failure touching a state-changing call is surfaced, never swallowed, and
//! blocks checkpoint advancement so reruns stay safe.

use crate::checkpoint::CheckpointError;
use crate::identity::{Address, AttributeKind, Word};
use thiserror::Error;

/// Transient infrastructure failures from the ledger client. Callers retry
/// these with bounded backoff before escalating.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Timed out after {waited_ms}ms waiting for confirmation of {tx}")]
    ConfirmationTimeout { tx: String, waited_ms: u64 },
}

impl LedgerError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        LedgerError::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Failures of a migration run. `Unauthorized` and `CallRejected` are fatal:
/// the checkpoint is not advanced past the failing chunk.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Identity {identity} lacks the governance capability")]
    Unauthorized { identity: Address },

    #[error("Migration call for chunk {chunk_index} rejected: {reason}")]
    CallRejected { chunk_index: u64, reason: String },

    #[error("Run cancelled before chunk {chunk_index}")]
    Cancelled { chunk_index: u64 },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Failures replacing the logic behind the proxy. Both variants are fatal;
/// no retry masks an authorization or compatibility failure.
#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Identity {identity} lacks the governance capability")]
    Unauthorized { identity: Address },

    #[error("Upgrade call rejected: {reason}")]
    Rejected { reason: String },

    #[error("Proxy logic pointer reads {actual} after upgrade, expected {expected}")]
    BindingMismatch { expected: Address, actual: Address },
}

/// Pre/post discrepancies detected by the verification harness. Fatal to the
/// deployment pipeline; never auto-corrected.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error(
        "Attribute mismatch for {account} kind {kind}: {field} expected {expected}, got {actual}"
    )]
    Mismatch {
        account: Address,
        kind: AttributeKind,
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Record for {account} kind {kind} missing from post snapshot")]
    MissingRecord { account: Address, kind: AttributeKind },

    #[error("Storage slot {slot} changed across upgrade: {before} -> {after}")]
    SlotMismatch { slot: Word, before: Word, after: Word },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: &'static str },

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Master error type for all coordinator failures.
#[derive(Debug, Error)]
pub enum AttestorError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Upgrade error: {0}")]
    Upgrade(#[from] UpgradeError),

    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Result type alias for coordinator operations.
pub type AttestorResult<T> = Result<T, AttestorError>;
