//! Attestor test utilities.
//!
//! Centralized test infrastructure for the workspace: the mock ledger, a
//! fast-retry coordinator config, and fixtures that stand up a store with
//! mint history and legacy attribute records.

// Re-export the mock ledger from its source crate
pub use attestor_ledger::MockLedger;

// Re-export core types for convenience
pub use attestor_core::{
    kinds, Address, AttributeKind, AttributeRecord, BlockRange, CoordinatorConfig,
    InMemoryCheckpointStore, MigrationCheckpoint, ProxyBinding, RetryConfig, Word,
    GOVERNANCE_ROLE, IMPLEMENTATION_SLOT,
};

use std::time::Duration;

/// Coordinator config with millisecond backoffs, sized for tests.
pub fn test_config() -> CoordinatorConfig {
    CoordinatorConfig {
        governance: Address::derived("governance"),
        store: Address::derived("store-proxy"),
        identity: Address::derived("operator"),
        chunk_size: 5,
        scan_step: 1_000,
        confirmation_timeout: Duration::from_secs(1),
        retry: RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            backoff_multiplier: 2.0,
        },
    }
}

/// Deterministic holder address for index `i`.
pub fn holder(i: usize) -> Address {
    Address::derived(&format!("holder-{i}"))
}

pub fn holders(n: usize) -> Vec<Address> {
    (0..n).map(holder).collect()
}

/// A legacy record distinguishable per holder index.
pub fn legacy_record(i: usize) -> AttributeRecord {
    AttributeRecord::new(
        Word::named(&format!("digest-{i}")),
        (i as u64) + 1,
        Address::derived("issuer-alpha"),
    )
}

/// A ledger with governance granted to the config's identity, the upgraded
/// logic installed, and `n` holders minted one block apart with a legacy
/// identity-digest record each.
pub fn migration_ready_ledger(config: &CoordinatorConfig, n: usize) -> MockLedger {
    let ledger = MockLedger::new(config.governance, config.store, Address::derived("logic-v1"));
    ledger.grant_role(*GOVERNANCE_ROLE, config.identity);
    ledger.install_migration();
    seed_holders(&ledger, n);
    ledger
}

/// Same fixture without the upgrade applied: legacy logic still bound, so
/// the migration entry point is not installed yet.
pub fn pre_upgrade_ledger(config: &CoordinatorConfig, n: usize) -> MockLedger {
    let ledger = MockLedger::new(config.governance, config.store, Address::derived("logic-v1"));
    ledger.grant_role(*GOVERNANCE_ROLE, config.identity);
    seed_holders(&ledger, n);
    ledger
}

fn seed_holders(ledger: &MockLedger, n: usize) {
    for i in 0..n {
        let account = holder(i);
        ledger.push_mint(i as u64, Address::ZERO, account);
        ledger.seed_legacy(account, *kinds::IDENTITY_DIGEST, legacy_record(i));
    }
}
