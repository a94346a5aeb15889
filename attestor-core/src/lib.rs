//! Core data types for the Attestor migration and upgrade coordinator.
//!
//! The coordinator migrates per-account attribute records of an
//! identity-attestation protocol from a legacy storage layout to a new one,
//! and swaps the logic behind the protocol's upgradeable proxy, both gated
//! by a governance capability. This crate holds the domain model shared by
//! the ledger seam and the coordinator itself: identity primitives, block
//! ranges and chunk math, checkpoints, configuration, and the error
//! taxonomy.

pub mod attribute;
pub mod capability;
pub mod checkpoint;
pub mod chunk;
pub mod config;
pub mod error;
pub mod identity;
pub mod range;

pub use attribute::AttributeRecord;
pub use capability::{ProxyBinding, RoleId, GOVERNANCE_ROLE, IMPLEMENTATION_SLOT};
pub use checkpoint::{
    CheckpointError, CheckpointStore, InMemoryCheckpointStore, JsonFileCheckpointStore,
    MigrationCheckpoint,
};
pub use chunk::ChunkPlan;
pub use config::{CoordinatorConfig, RetryConfig};
pub use error::{
    AttestorError, AttestorResult, ConfigError, LedgerError, MigrationError, UpgradeError,
    VerificationError,
};
pub use identity::{kinds, Address, AttributeKind, HexParseError, Word};
pub use range::{BlockRange, InvalidBlockRange};
