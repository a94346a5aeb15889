//! Wire types shared by every ledger client implementation.

use attestor_core::{Address, BlockRange, Word};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a submitted transaction, used to await its confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle(pub Word);

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One historical log entry as returned by a log query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature.
    pub topics: Vec<Word>,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub log_index: u64,
}

/// Filter for a historical log query over a half-open block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub contract: Address,
    pub topic0: Word,
    pub range: BlockRange,
}

/// Receipt for a confirmed state-changing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx: TxHandle,
    pub block_number: u64,
    /// Attribute deltas the call actually applied. Resubmitting an
    /// already-migrated chunk confirms with `migrated: 0`.
    pub migrated: u64,
}

/// Why a state-changing call reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevertReason {
    /// The calling identity lacks the required role.
    MissingRole,
    /// Any other domain revert, with the contract's message.
    Message(String),
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertReason::MissingRole => write!(f, "caller is missing the required role"),
            RevertReason::Message(msg) => write!(f, "{}", msg),
        }
    }
}

/// Definite outcome of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutcome {
    Confirmed(Receipt),
    Reverted(RevertReason),
}

/// A state-changing call routed through the submitting identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub contract: Address,
    pub from: Address,
    pub action: CallAction,
}

/// The two state-changing entry points the coordinator drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallAction {
    /// `migrateAttributes(address[])`, idempotent per account.
    MigrateAttributes(Vec<Address>),
    /// `upgradeLogic(address)`, which atomically rebinds the proxy's logic
    /// pointer without touching application storage.
    UpgradeLogic(Address),
}

impl CallAction {
    /// Four-byte function selector for the wire encoding.
    pub fn selector(&self) -> [u8; 4] {
        let word = match self {
            CallAction::MigrateAttributes(_) => Word::named("migrateAttributes(address[])"),
            CallAction::UpgradeLogic(_) => Word::named("upgradeLogic(address)"),
        };
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&word.as_bytes()[..4]);
        selector
    }
}

impl fmt::Display for CallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallAction::MigrateAttributes(accounts) => {
                write!(f, "migrateAttributes({} accounts)", accounts.len())
            }
            CallAction::UpgradeLogic(logic) => write!(f, "upgradeLogic({})", logic),
        }
    }
}

/// Event topics of the attribute store.
pub mod topics {
    use attestor_core::Word;
    use once_cell::sync::Lazy;

    /// Emitted when a record is created. Topics: `[signature, origin,
    /// account]`; a null origin marks a mint.
    pub static RECORD_MINTED: Lazy<Word> =
        Lazy::new(|| Word::named("RecordMinted(address,address,bytes32)"));

    /// Emitted once per attribute delta a migration call applies. Counting
    /// these in a receipt yields the call's `migrated` figure.
    pub static ATTRIBUTE_MIGRATED: Lazy<Word> =
        Lazy::new(|| Word::named("AttributeMigrated(address,bytes32)"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_are_distinct_and_stable() {
        let migrate = CallAction::MigrateAttributes(vec![]).selector();
        let upgrade = CallAction::UpgradeLogic(Address::ZERO).selector();
        assert_ne!(migrate, upgrade);
        assert_eq!(migrate, CallAction::MigrateAttributes(vec![Address::ZERO]).selector());
    }

    #[test]
    fn test_revert_reason_display() {
        assert!(RevertReason::MissingRole.to_string().contains("missing"));
        assert_eq!(
            RevertReason::Message("layout guard".to_string()).to_string(),
            "layout guard"
        );
    }
}
