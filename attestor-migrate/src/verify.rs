//! Verification harness.
//!
//! Reads attribute state and raw storage slots before and after a
//! migration/upgrade boundary and asserts structural consistency. Nothing
//! here mutates state; this is the acceptance gate a deployment pipeline
//! runs before declaring a batch complete. Snapshots must only be collected
//! after a chunk's confirmation so they never observe a half-applied call.

use attestor_core::{Address, AttributeKind, AttributeRecord, VerificationError, Word};
use attestor_ledger::LedgerClient;
use std::collections::{BTreeMap, BTreeSet};

/// Transformation rule from the legacy representation to the new one.
pub type RecordMapping = fn(&AttributeRecord) -> AttributeRecord;

/// The mapping for layout-only migrations: values carry over unchanged.
pub fn identity_mapping(record: &AttributeRecord) -> AttributeRecord {
    *record
}

/// Point-in-time view of attribute records for a set of accounts and kinds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    records: BTreeMap<(Address, AttributeKind), AttributeRecord>,
}

impl Snapshot {
    /// Read every (account, kind) pair through the store's external bulk
    /// read path. Repeated accounts collapse to one read set.
    pub async fn collect<C: LedgerClient + ?Sized>(
        client: &C,
        store: Address,
        accounts: &[Address],
        kinds: &[AttributeKind],
    ) -> Result<Self, VerificationError> {
        let unique: BTreeSet<Address> = accounts.iter().copied().collect();
        let mut records = BTreeMap::new();
        for account in unique {
            let fetched = client.get_attributes_bulk(store, account, kinds).await?;
            if fetched.len() != kinds.len() {
                return Err(VerificationError::Ledger(
                    attestor_core::LedgerError::unavailable(format!(
                        "bulk read returned {} records for {} kinds",
                        fetched.len(),
                        kinds.len()
                    )),
                ));
            }
            for (kind, record) in kinds.iter().zip(fetched) {
                records.insert((account, *kind), record);
            }
        }
        Ok(Self { records })
    }

    /// Rebuild a snapshot from persisted entries.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (Address, AttributeKind, AttributeRecord)>,
    ) -> Self {
        Self {
            records: entries
                .into_iter()
                .map(|(account, kind, record)| ((account, kind), record))
                .collect(),
        }
    }

    pub fn get(&self, account: Address, kind: AttributeKind) -> Option<&AttributeRecord> {
        self.records.get(&(account, kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Address, AttributeKind), &AttributeRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Compare pre- and post-snapshots against the expected transformation.
///
/// Accounts in `migrated` must match `mapping` applied to their
/// pre-snapshot record; untouched accounts must be identical. Fails on the
/// first discrepancy, field by field, so the report names exactly what
/// diverged.
pub fn verify_attributes(
    pre: &Snapshot,
    post: &Snapshot,
    migrated: &BTreeSet<Address>,
    mapping: RecordMapping,
) -> Result<(), VerificationError> {
    for ((account, kind), pre_record) in pre.iter() {
        let Some(post_record) = post.get(*account, *kind) else {
            return Err(VerificationError::MissingRecord {
                account: *account,
                kind: *kind,
            });
        };
        let expected = if migrated.contains(account) {
            mapping(pre_record)
        } else {
            *pre_record
        };
        compare_record(*account, *kind, &expected, post_record)?;
    }
    Ok(())
}

fn compare_record(
    account: Address,
    kind: AttributeKind,
    expected: &AttributeRecord,
    actual: &AttributeRecord,
) -> Result<(), VerificationError> {
    if expected.value != actual.value {
        return Err(VerificationError::Mismatch {
            account,
            kind,
            field: "value",
            expected: expected.value.to_string(),
            actual: actual.value.to_string(),
        });
    }
    if expected.epoch != actual.epoch {
        return Err(VerificationError::Mismatch {
            account,
            kind,
            field: "epoch",
            expected: expected.epoch.to_string(),
            actual: actual.epoch.to_string(),
        });
    }
    if expected.issuer != actual.issuer {
        return Err(VerificationError::Mismatch {
            account,
            kind,
            field: "issuer",
            expected: expected.issuer.to_string(),
            actual: actual.issuer.to_string(),
        });
    }
    Ok(())
}

/// Point-in-time view of raw storage slots of one contract.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlotSnapshot {
    slots: BTreeMap<Word, Word>,
}

impl SlotSnapshot {
    pub async fn collect<C: LedgerClient + ?Sized>(
        client: &C,
        contract: Address,
        slots: &[Word],
    ) -> Result<Self, VerificationError> {
        let mut values = BTreeMap::new();
        for slot in slots {
            let value = client.read_slot(contract, *slot).await?;
            values.insert(*slot, value);
        }
        Ok(Self { slots: values })
    }

    /// Rebuild a slot snapshot from persisted entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (Word, Word)>) -> Self {
        Self {
            slots: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, slot: Word) -> Option<Word> {
        self.slots.get(&slot).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Word, &Word)> {
        self.slots.iter()
    }
}

/// Every declared slot must read byte-identically across the boundary.
pub fn verify_slots(pre: &SlotSnapshot, post: &SlotSnapshot) -> Result<(), VerificationError> {
    for (slot, before) in &pre.slots {
        let after = post.get(*slot).unwrap_or(Word::ZERO);
        if after != *before {
            return Err(VerificationError::SlotMismatch {
                slot: *slot,
                before: *before,
                after,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: &str, epoch: u64) -> AttributeRecord {
        AttributeRecord::new(Word::named(tag), epoch, Address::derived("issuer"))
    }

    fn snapshot(entries: &[(Address, AttributeKind, AttributeRecord)]) -> Snapshot {
        let mut records = BTreeMap::new();
        for (account, kind, rec) in entries {
            records.insert((*account, *kind), *rec);
        }
        Snapshot { records }
    }

    #[test]
    fn test_untouched_accounts_must_be_identical() {
        let account = Address::derived("holder-1");
        let kind = *attestor_core::kinds::JURISDICTION;
        let pre = snapshot(&[(account, kind, record("US", 1))]);
        let post_same = pre.clone();
        let post_drifted = snapshot(&[(account, kind, record("US", 2))]);

        let migrated = BTreeSet::new();
        assert!(verify_attributes(&pre, &post_same, &migrated, identity_mapping).is_ok());
        let err =
            verify_attributes(&pre, &post_drifted, &migrated, identity_mapping).unwrap_err();
        assert!(matches!(err, VerificationError::Mismatch { field: "epoch", .. }));
    }

    #[test]
    fn test_migrated_accounts_follow_the_mapping() {
        let account = Address::derived("holder-1");
        let kind = *attestor_core::kinds::COMPLIANCE_STATUS;
        // Mapping that bumps the epoch, as a value-rewriting migration would.
        fn bump_epoch(record: &AttributeRecord) -> AttributeRecord {
            AttributeRecord { epoch: record.epoch + 1, ..*record }
        }

        let pre = snapshot(&[(account, kind, record("clear", 4))]);
        let post = snapshot(&[(account, kind, record("clear", 5))]);
        let migrated: BTreeSet<Address> = [account].into_iter().collect();

        assert!(verify_attributes(&pre, &post, &migrated, bump_epoch).is_ok());
        // The same post state fails when the account is not declared migrated.
        let err = verify_attributes(&pre, &post, &BTreeSet::new(), bump_epoch).unwrap_err();
        assert!(matches!(err, VerificationError::Mismatch { .. }));
    }

    #[test]
    fn test_missing_post_record_is_reported() {
        let account = Address::derived("holder-1");
        let kind = *attestor_core::kinds::IDENTITY_DIGEST;
        let pre = snapshot(&[(account, kind, record("digest", 1))]);
        let post = Snapshot::default();

        let err = verify_attributes(&pre, &post, &BTreeSet::new(), identity_mapping).unwrap_err();
        assert!(matches!(err, VerificationError::MissingRecord { .. }));
    }

    #[test]
    fn test_slot_drift_is_reported() {
        let slot = Word::named("app-slot-3");
        let pre = SlotSnapshot {
            slots: [(slot, Word::named("before"))].into_iter().collect(),
        };
        let post = SlotSnapshot {
            slots: [(slot, Word::named("after"))].into_iter().collect(),
        };
        let err = verify_slots(&pre, &post).unwrap_err();
        assert!(matches!(err, VerificationError::SlotMismatch { .. }));
        assert!(verify_slots(&pre, &pre.clone()).is_ok());
    }
}
