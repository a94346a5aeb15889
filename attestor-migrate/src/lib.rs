//! Attestor coordinator core.
//!
//! Four collaborating pieces move an attribute store across a storage-layout
//! migration while the system keeps serving reads:
//!
//! - [`scanner`] replays historical mint events to discover every account
//!   that ever held a record.
//! - [`driver`] submits migration calls for the discovered accounts in
//!   bounded chunks, strictly sequentially, checkpointing after each.
//! - [`upgrade`] swaps the logic behind the store proxy, gated by the
//!   governance capability.
//! - [`verify`] snapshots attribute state and raw slots around the boundary
//!   and asserts structural invariants.
//!
//! [`run::MigrationRun`] ties the first three into the resumable sweep the
//! operator invokes.

pub mod driver;
pub mod run;
pub mod scanner;
pub mod upgrade;
pub mod verify;

pub use driver::{BatchDriver, CancelFlag, DriverPhase, RunReport};
pub use run::{MigrationRun, SweepReport};
pub use scanner::{minted_accounts, scan};
pub use upgrade::{UpgradeExecutor, UpgradeOutcome};
pub use verify::{
    identity_mapping, verify_attributes, verify_slots, RecordMapping, SlotSnapshot, Snapshot,
};
