//! Proxy logic upgrade execution.
//!
//! Replaces the logic bound behind the live proxy without altering the
//! proxy's address or touching application storage: the upgrade call changes
//! only the routing of future calls. Layout compatibility between old and
//! new logic is a build-time collaborator's responsibility and is assumed
//! verified before this executor runs.

use attestor_core::{
    Address, CoordinatorConfig, ProxyBinding, UpgradeError, GOVERNANCE_ROLE, IMPLEMENTATION_SLOT,
};
use attestor_ledger::{retry::with_backoff, Call, CallAction, LedgerClient, Receipt, RevertReason, TxOutcome};

/// Result of a confirmed upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeOutcome {
    /// The binding after the swap; same proxy, new logic.
    pub binding: ProxyBinding,
    pub receipt: Receipt,
}

/// Executes the single atomic logic-rebind call, gated by the governance
/// capability.
pub struct UpgradeExecutor<'a, C: LedgerClient + ?Sized> {
    client: &'a C,
    config: &'a CoordinatorConfig,
}

impl<'a, C: LedgerClient + ?Sized> UpgradeExecutor<'a, C> {
    pub fn new(client: &'a C, config: &'a CoordinatorConfig) -> Self {
        Self { client, config }
    }

    /// Rebind the proxy's logic pointer to `new_logic`.
    ///
    /// Fails closed: the governance capability is checked before anything is
    /// submitted, and a missing-role revert from the contract itself is
    /// classified the same way. Neither `Unauthorized` nor `Rejected` is
    /// ever retried; transient transport failures are, within the configured
    /// budget.
    pub async fn upgrade(
        &self,
        binding: ProxyBinding,
        new_logic: Address,
    ) -> Result<UpgradeOutcome, UpgradeError> {
        let client = self.client;
        let config = self.config;

        let authorized = with_backoff(&config.retry, "hasRole", || {
            client.has_role(config.governance, *GOVERNANCE_ROLE, config.identity)
        })
        .await?;
        if !authorized {
            return Err(UpgradeError::Unauthorized {
                identity: config.identity,
            });
        }

        let call = Call {
            contract: binding.proxy,
            from: config.identity,
            action: CallAction::UpgradeLogic(new_logic),
        };
        let outcome = with_backoff(&config.retry, "upgradeLogic", || {
            let call = call.clone();
            async move {
                let tx = client.submit(call).await?;
                client.confirm(tx).await
            }
        })
        .await?;

        let receipt = match outcome {
            TxOutcome::Confirmed(receipt) => receipt,
            TxOutcome::Reverted(RevertReason::MissingRole) => {
                return Err(UpgradeError::Unauthorized {
                    identity: config.identity,
                });
            }
            TxOutcome::Reverted(RevertReason::Message(reason)) => {
                return Err(UpgradeError::Rejected { reason });
            }
        };

        // The rebind is only trusted once the logic pointer reads back.
        let bound = with_backoff(&config.retry, "read implementation slot", || {
            client.read_slot(binding.proxy, *IMPLEMENTATION_SLOT)
        })
        .await?;
        let actual = bound.to_address();
        if actual != new_logic {
            return Err(UpgradeError::BindingMismatch {
                expected: new_logic,
                actual,
            });
        }

        tracing::info!(proxy = %binding.proxy, logic = %new_logic, "proxy logic rebound");
        Ok(UpgradeOutcome {
            binding: binding.rebound(new_logic),
            receipt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attestor_core::{LedgerError, RetryConfig};
    use attestor_ledger::MockLedger;
    use std::time::Duration;

    fn config() -> CoordinatorConfig {
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

    #[tokio::test]
    async fn test_upgrade_rebinds_and_reads_back() {
        let config = config();
        let ledger = MockLedger::new(config.governance, config.store, Address::derived("logic-v1"));
        ledger.grant_role(*GOVERNANCE_ROLE, config.identity);

        let binding = ProxyBinding::new(config.store, Address::derived("logic-v1"));
        let new_logic = Address::derived("logic-v2");
        let executor = UpgradeExecutor::new(&ledger, &config);
        let outcome = executor.upgrade(binding, new_logic).await.unwrap();

        assert_eq!(outcome.binding.proxy, config.store);
        assert_eq!(outcome.binding.logic, new_logic);
        assert!(ledger.is_migration_installed());
    }

    #[tokio::test]
    async fn test_preflight_fails_closed_without_submitting() {
        let config = config();
        let ledger = MockLedger::new(config.governance, config.store, Address::derived("logic-v1"));

        let binding = ProxyBinding::new(config.store, Address::derived("logic-v1"));
        let executor = UpgradeExecutor::new(&ledger, &config);
        let err = executor
            .upgrade(binding, Address::derived("logic-v2"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpgradeError::Unauthorized { .. }));
        // Fail closed: nothing reached the ledger.
        assert!(ledger.submitted_calls().is_empty());
    }

    #[tokio::test]
    async fn test_transient_preflight_failures_are_retried() {
        let config = config();
        let ledger = MockLedger::new(config.governance, config.store, Address::derived("logic-v1"));
        ledger.grant_role(*GOVERNANCE_ROLE, config.identity);
        ledger.fail_next_read(LedgerError::unavailable("rpc down"));

        let binding = ProxyBinding::new(config.store, Address::derived("logic-v1"));
        let executor = UpgradeExecutor::new(&ledger, &config);
        assert!(executor.upgrade(binding, Address::derived("logic-v2")).await.is_ok());
    }
}
