//! In-memory ledger for tests and dry runs.
//!
//! Models exactly the contract surface the coordinator drives: mint-event
//! history, the legacy and migrated attribute layouts behind one external
//! read path, the governance role registry, and the proxy's implementation
//! slot. State-changing calls are applied atomically at submission and
//! observable once confirmed, matching the one-in-flight discipline of the
//! real client.

use crate::client::LedgerClient;
use crate::types::{topics, Call, CallAction, LogEntry, LogFilter, Receipt, RevertReason, TxHandle, TxOutcome};
use async_trait::async_trait;
use attestor_core::{
    Address, AttributeKind, AttributeRecord, LedgerError, RoleId, Word, GOVERNANCE_ROLE,
    IMPLEMENTATION_SLOT,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct MockState {
    governance: Address,
    store: Address,
    latest_block: u64,
    logs: Vec<LogEntry>,
    /// Legacy-layout records, readable through the external path until the
    /// logic upgrade installs the new read path.
    legacy: BTreeMap<(Address, AttributeKind), AttributeRecord>,
    /// New-layout records, populated per account by migration calls.
    migrated: BTreeMap<(Address, AttributeKind), AttributeRecord>,
    migrated_accounts: BTreeSet<Address>,
    roles: BTreeSet<(RoleId, Address)>,
    slots: BTreeMap<(Address, Word), Word>,
    /// Whether the upgraded logic (new read path + migration entry point)
    /// is installed behind the proxy.
    migration_installed: bool,
    /// When set, log queries wider than this span fail as unavailable.
    max_query_span: Option<u64>,
    read_faults: VecDeque<LedgerError>,
    submit_faults: VecDeque<LedgerError>,
    confirm_faults: VecDeque<LedgerError>,
    pending: BTreeMap<Word, TxOutcome>,
    submitted: Vec<Call>,
    tx_counter: u64,
}

/// Mock implementation of [`LedgerClient`].
#[derive(Debug, Default)]
pub struct MockLedger {
    inner: Mutex<MockState>,
}

impl MockLedger {
    /// A fresh ledger with the legacy logic bound behind the store proxy.
    pub fn new(governance: Address, store: Address, legacy_logic: Address) -> Self {
        let mut state = MockState {
            governance,
            store,
            ..MockState::default()
        };
        state
            .slots
            .insert((store, *IMPLEMENTATION_SLOT), Word::from_address(legacy_logic));
        Self {
            inner: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // Mock-only: a poisoned lock means a test already panicked.
        self.inner.lock().expect("mock ledger lock poisoned")
    }

    // ========================================================================
    // SEEDING
    // ========================================================================

    pub fn grant_role(&self, role: RoleId, identity: Address) {
        self.lock().roles.insert((role, identity));
    }

    pub fn revoke_role(&self, role: RoleId, identity: Address) {
        self.lock().roles.remove(&(role, identity));
    }

    /// Record a legacy-layout attribute for an account.
    pub fn seed_legacy(&self, account: Address, kind: AttributeKind, record: AttributeRecord) {
        self.lock().legacy.insert((account, kind), record);
    }

    /// Append a record-creation event at `block`. A null origin marks a mint.
    pub fn push_mint(&self, block: u64, origin: Address, account: Address) {
        let mut state = self.lock();
        let log_index = state.logs.len() as u64;
        let store = state.store;
        state.logs.push(LogEntry {
            address: store,
            topics: vec![
                *topics::RECORD_MINTED,
                Word::from_address(origin),
                Word::from_address(account),
            ],
            data: Vec::new(),
            block_number: block,
            log_index,
        });
        state.latest_block = state.latest_block.max(block);
    }

    pub fn set_latest_block(&self, block: u64) {
        self.lock().latest_block = block;
    }

    pub fn set_slot(&self, contract: Address, slot: Word, value: Word) {
        self.lock().slots.insert((contract, slot), value);
    }

    /// Install the upgraded logic directly, as if a prior upgrade run
    /// already happened. Tests exercising only migration start here.
    pub fn install_migration(&self) {
        self.lock().migration_installed = true;
    }

    /// Make log queries wider than `span` blocks fail as unavailable.
    pub fn limit_query_span(&self, span: u64) {
        self.lock().max_query_span = Some(span);
    }

    // ========================================================================
    // FAULT INJECTION
    // ========================================================================

    pub fn fail_next_read(&self, err: LedgerError) {
        self.lock().read_faults.push_back(err);
    }

    pub fn fail_next_submit(&self, err: LedgerError) {
        self.lock().submit_faults.push_back(err);
    }

    pub fn fail_next_confirm(&self, err: LedgerError) {
        self.lock().confirm_faults.push_back(err);
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    /// Journal of every submitted call, in submission order.
    pub fn submitted_calls(&self) -> Vec<Call> {
        self.lock().submitted.clone()
    }

    pub fn migrated_accounts(&self) -> BTreeSet<Address> {
        self.lock().migrated_accounts.clone()
    }

    pub fn is_migration_installed(&self) -> bool {
        self.lock().migration_installed
    }
}

impl MockState {
    fn has_governance_role(&self, identity: Address) -> bool {
        self.roles.contains(&(*GOVERNANCE_ROLE, identity))
    }

    fn execute(&mut self, call: &Call) -> TxOutcome {
        match &call.action {
            CallAction::MigrateAttributes(accounts) => {
                if !self.migration_installed {
                    return TxOutcome::Reverted(RevertReason::Message(
                        "migration entry point not installed".to_string(),
                    ));
                }
                if !self.has_governance_role(call.from) {
                    return TxOutcome::Reverted(RevertReason::MissingRole);
                }
                let mut applied = 0u64;
                for account in accounts {
                    // Already-migrated accounts are a no-op, not an error.
                    if !self.migrated_accounts.insert(*account) {
                        continue;
                    }
                    let records: Vec<_> = self
                        .legacy
                        .range((*account, AttributeKind::default())..)
                        .take_while(|((a, _), _)| a == account)
                        .map(|(key, record)| (*key, *record))
                        .collect();
                    for (key, record) in records {
                        self.migrated.insert(key, record);
                        applied += 1;
                    }
                }
                self.latest_block += 1;
                TxOutcome::Confirmed(Receipt {
                    tx: TxHandle(Word::ZERO), // patched by the caller
                    block_number: self.latest_block,
                    migrated: applied,
                })
            }
            CallAction::UpgradeLogic(new_logic) => {
                if !self.has_governance_role(call.from) {
                    return TxOutcome::Reverted(RevertReason::MissingRole);
                }
                self.slots.insert(
                    (call.contract, *IMPLEMENTATION_SLOT),
                    Word::from_address(*new_logic),
                );
                self.migration_installed = true;
                self.latest_block += 1;
                TxOutcome::Confirmed(Receipt {
                    tx: TxHandle(Word::ZERO),
                    block_number: self.latest_block,
                    migrated: 0,
                })
            }
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn latest_block(&self) -> Result<u64, LedgerError> {
        let mut state = self.lock();
        if let Some(err) = state.read_faults.pop_front() {
            return Err(err);
        }
        Ok(state.latest_block)
    }

    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError> {
        let mut state = self.lock();
        if let Some(err) = state.read_faults.pop_front() {
            return Err(err);
        }
        if let Some(span) = state.max_query_span {
            if filter.range.len() > span {
                return Err(LedgerError::unavailable(format!(
                    "query range {} exceeds {} blocks",
                    filter.range, span
                )));
            }
        }
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                log.address == filter.contract
                    && log.topics.first() == Some(&filter.topic0)
                    && filter.range.contains(log.block_number)
            })
            .cloned()
            .collect())
    }

    async fn read_slot(&self, contract: Address, slot: Word) -> Result<Word, LedgerError> {
        let mut state = self.lock();
        if let Some(err) = state.read_faults.pop_front() {
            return Err(err);
        }
        Ok(state.slots.get(&(contract, slot)).copied().unwrap_or(Word::ZERO))
    }

    async fn get_attributes_bulk(
        &self,
        _store: Address,
        account: Address,
        kinds: &[AttributeKind],
    ) -> Result<Vec<AttributeRecord>, LedgerError> {
        let mut state = self.lock();
        if let Some(err) = state.read_faults.pop_front() {
            return Err(err);
        }
        let records = kinds
            .iter()
            .map(|kind| {
                if state.migration_installed {
                    // New read path: migrated accounts resolve from the new
                    // layout, everything else reads as the empty sentinel.
                    if state.migrated_accounts.contains(&account) {
                        state
                            .migrated
                            .get(&(account, *kind))
                            .copied()
                            .unwrap_or(AttributeRecord::EMPTY)
                    } else {
                        AttributeRecord::EMPTY
                    }
                } else {
                    state
                        .legacy
                        .get(&(account, *kind))
                        .copied()
                        .unwrap_or(AttributeRecord::EMPTY)
                }
            })
            .collect();
        Ok(records)
    }

    async fn has_role(
        &self,
        governance: Address,
        role: RoleId,
        identity: Address,
    ) -> Result<bool, LedgerError> {
        let mut state = self.lock();
        if let Some(err) = state.read_faults.pop_front() {
            return Err(err);
        }
        Ok(governance == state.governance && state.roles.contains(&(role, identity)))
    }

    async fn submit(&self, call: Call) -> Result<TxHandle, LedgerError> {
        let mut state = self.lock();
        if let Some(err) = state.submit_faults.pop_front() {
            return Err(err);
        }
        state.tx_counter += 1;
        let handle = TxHandle(Word::named(&format!("mock-tx-{}", state.tx_counter)));
        state.submitted.push(call.clone());
        let outcome = match state.execute(&call) {
            TxOutcome::Confirmed(receipt) => TxOutcome::Confirmed(Receipt { tx: handle, ..receipt }),
            reverted => reverted,
        };
        state.pending.insert(handle.0, outcome);
        Ok(handle)
    }

    async fn confirm(&self, tx: TxHandle) -> Result<TxOutcome, LedgerError> {
        let mut state = self.lock();
        if let Some(err) = state.confirm_faults.pop_front() {
            return Err(err);
        }
        state
            .pending
            .remove(&tx.0)
            .ok_or_else(|| LedgerError::unavailable(format!("unknown transaction {}", tx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (MockLedger, Address, Address) {
        let governance = Address::derived("governance");
        let store = Address::derived("store-proxy");
        let ledger = MockLedger::new(governance, store, Address::derived("logic-v1"));
        (ledger, governance, store)
    }

    #[tokio::test]
    async fn test_mint_logs_filtered_by_range() {
        let (ledger, _, store) = fixture();
        ledger.push_mint(5, Address::ZERO, Address::derived("holder-1"));
        ledger.push_mint(9, Address::ZERO, Address::derived("holder-2"));

        let filter = LogFilter {
            contract: store,
            topic0: *topics::RECORD_MINTED,
            range: attestor_core::BlockRange::new(0, 6).unwrap(),
        };
        let logs = ledger.query_logs(&filter).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, 5);
    }

    #[tokio::test]
    async fn test_migrate_requires_installed_entry_point() {
        let (ledger, _, store) = fixture();
        let operator = Address::derived("operator");
        ledger.grant_role(*GOVERNANCE_ROLE, operator);

        let call = Call {
            contract: store,
            from: operator,
            action: CallAction::MigrateAttributes(vec![Address::derived("holder-1")]),
        };
        let tx = ledger.submit(call).await.unwrap();
        let outcome = ledger.confirm(tx).await.unwrap();
        assert!(matches!(outcome, TxOutcome::Reverted(RevertReason::Message(_))));
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent_per_account() {
        let (ledger, _, store) = fixture();
        let operator = Address::derived("operator");
        let holder = Address::derived("holder-1");
        ledger.grant_role(*GOVERNANCE_ROLE, operator);
        ledger.install_migration();
        ledger.seed_legacy(
            holder,
            *attestor_core::kinds::JURISDICTION,
            AttributeRecord::new(Word::named("US"), 3, Address::derived("issuer")),
        );

        let call = Call {
            contract: store,
            from: operator,
            action: CallAction::MigrateAttributes(vec![holder]),
        };
        let tx = ledger.submit(call.clone()).await.unwrap();
        let first = ledger.confirm(tx).await.unwrap();
        let TxOutcome::Confirmed(receipt) = first else {
            panic!("expected confirmation");
        };
        assert_eq!(receipt.migrated, 1);

        // Resubmission confirms with zero deltas.
        let tx = ledger.submit(call).await.unwrap();
        let TxOutcome::Confirmed(receipt) = ledger.confirm(tx).await.unwrap() else {
            panic!("expected confirmation");
        };
        assert_eq!(receipt.migrated, 0);
    }

    #[tokio::test]
    async fn test_upgrade_rewrites_only_the_implementation_slot() {
        let (ledger, _, store) = fixture();
        let operator = Address::derived("operator");
        ledger.grant_role(*GOVERNANCE_ROLE, operator);
        let app_slot = Word::named("app-slot-0");
        ledger.set_slot(store, app_slot, Word::named("app-value"));

        let new_logic = Address::derived("logic-v2");
        let tx = ledger
            .submit(Call {
                contract: store,
                from: operator,
                action: CallAction::UpgradeLogic(new_logic),
            })
            .await
            .unwrap();
        assert!(matches!(ledger.confirm(tx).await.unwrap(), TxOutcome::Confirmed(_)));

        let bound = ledger.read_slot(store, *IMPLEMENTATION_SLOT).await.unwrap();
        assert_eq!(bound.to_address(), new_logic);
        let untouched = ledger.read_slot(store, app_slot).await.unwrap();
        assert_eq!(untouched, Word::named("app-value"));
    }

    #[tokio::test]
    async fn test_upgrade_without_role_reverts_with_missing_role() {
        let (ledger, _, store) = fixture();
        let intruder = Address::derived("intruder");
        let tx = ledger
            .submit(Call {
                contract: store,
                from: intruder,
                action: CallAction::UpgradeLogic(Address::derived("logic-v2")),
            })
            .await
            .unwrap();
        assert_eq!(
            ledger.confirm(tx).await.unwrap(),
            TxOutcome::Reverted(RevertReason::MissingRole)
        );
        // Zero state change.
        let bound = ledger.read_slot(store, *IMPLEMENTATION_SLOT).await.unwrap();
        assert_eq!(bound.to_address(), Address::derived("logic-v1"));
        assert!(!ledger.is_migration_installed());
    }

    #[tokio::test]
    async fn test_read_path_switches_on_upgrade() {
        let (ledger, _, store) = fixture();
        let holder = Address::derived("holder-1");
        let kind = *attestor_core::kinds::IDENTITY_DIGEST;
        let record = AttributeRecord::new(Word::named("digest"), 5, Address::derived("issuer"));
        ledger.seed_legacy(holder, kind, record);

        // Legacy logic serves the legacy layout.
        let pre = ledger.get_attributes_bulk(store, holder, &[kind]).await.unwrap();
        assert_eq!(pre[0], record);

        // New logic reads the new layout: unmigrated accounts are empty.
        ledger.install_migration();
        let mid = ledger.get_attributes_bulk(store, holder, &[kind]).await.unwrap();
        assert!(mid[0].is_empty());
    }

    #[tokio::test]
    async fn test_fault_injection_consumes_one_failure() {
        let (ledger, _, _) = fixture();
        ledger.fail_next_read(LedgerError::unavailable("rpc down"));
        assert!(ledger.latest_block().await.is_err());
        assert!(ledger.latest_block().await.is_ok());
    }
}
