//! Persistence for verification snapshots.
//!
//! The `snapshot` command captures attribute and slot state before an
//! upgrade; `verify` reloads it afterwards as the pre-side of the
//! comparison.

use crate::error::CliError;
use attestor_core::{Address, AttributeKind, AttributeRecord, Word};
use attestor_migrate::{SlotSnapshot, Snapshot};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    /// Ledger head when the snapshot was taken.
    pub taken_at_block: u64,
    /// Discovered accounts, in discovery order.
    pub accounts: Vec<Address>,
    pub attributes: Vec<AttributeEntry>,
    pub slots: Vec<SlotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub account: Address,
    pub kind: AttributeKind,
    pub record: AttributeRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotEntry {
    pub slot: Word,
    pub value: Word,
}

impl PersistedSnapshot {
    pub fn from_views(
        taken_at_block: u64,
        accounts: Vec<Address>,
        attributes: &Snapshot,
        slots: &SlotSnapshot,
    ) -> Self {
        Self {
            taken_at_block,
            accounts,
            attributes: attributes
                .iter()
                .map(|((account, kind), record)| AttributeEntry {
                    account: *account,
                    kind: *kind,
                    record: *record,
                })
                .collect(),
            slots: slots
                .iter()
                .map(|(slot, value)| SlotEntry {
                    slot: *slot,
                    value: *value,
                })
                .collect(),
        }
    }

    pub fn attribute_snapshot(&self) -> Snapshot {
        Snapshot::from_entries(
            self.attributes
                .iter()
                .map(|entry| (entry.account, entry.kind, entry.record)),
        )
    }

    pub fn slot_snapshot(&self) -> SlotSnapshot {
        SlotSnapshot::from_entries(self.slots.iter().map(|entry| (entry.slot, entry.value)))
    }
}

pub fn load(path: &Path) -> Result<Option<PersistedSnapshot>, CliError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    let snapshot = serde_json::from_str::<PersistedSnapshot>(&contents)?;
    Ok(Some(snapshot))
}

pub fn save(path: &Path, snapshot: &PersistedSnapshot) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_file_roundtrip() {
        let account = Address::derived("holder-0");
        let kind = *attestor_core::kinds::IDENTITY_DIGEST;
        let record = AttributeRecord::new(Word::named("digest"), 1, Address::derived("issuer"));
        let attributes = Snapshot::from_entries([(account, kind, record)]);
        let slots = SlotSnapshot::from_entries([(Word::named("slot"), Word::named("value"))]);
        let persisted = PersistedSnapshot::from_views(42, vec![account], &attributes, &slots);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/snapshot.json");
        save(&path, &persisted).unwrap();
        let loaded = load(&path).unwrap().unwrap();

        assert_eq!(loaded.taken_at_block, 42);
        assert_eq!(loaded.attribute_snapshot(), attributes);
        assert_eq!(loaded.slot_snapshot().get(Word::named("slot")), Some(Word::named("value")));
    }
}
