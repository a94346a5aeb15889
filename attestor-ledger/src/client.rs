//! Async ledger client trait.
//!
//! This is the seam between the coordinator and the remote state machine.
//! Every method is a suspension point with a definite outcome: success, a
//! defined failure, or a timeout surfaced as a transient `LedgerError`.

use crate::types::{Call, LogEntry, LogFilter, TxHandle, TxOutcome};
use async_trait::async_trait;
use attestor_core::{Address, AttributeKind, AttributeRecord, LedgerError, RoleId, Word};

/// Client for reading from and writing to the ledger.
///
/// The submitting identity's transaction-ordering counter is external shared
/// state: implementations assume at most one coordinator process submits for
/// a given identity at a time, and the coordinator in turn keeps at most one
/// state-changing call in flight.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    // ========================================================================
    // READ PATH (retriable)
    // ========================================================================

    /// Highest indexed block.
    async fn latest_block(&self) -> Result<u64, LedgerError>;

    /// All log entries matching the filter, in log order.
    ///
    /// # Errors
    ///
    /// `LedgerError::Unavailable` if the node cannot service the query (node
    /// error, range too large). The caller decides whether to retry with a
    /// narrower range.
    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError>;

    /// Raw storage slot read.
    async fn read_slot(&self, contract: Address, slot: Word) -> Result<Word, LedgerError>;

    /// Bulk attribute read through the store's external read path.
    ///
    /// Returns one record per requested kind, in request order; unset
    /// records come back as the empty sentinel.
    async fn get_attributes_bulk(
        &self,
        store: Address,
        account: Address,
        kinds: &[AttributeKind],
    ) -> Result<Vec<AttributeRecord>, LedgerError>;

    /// Whether `identity` holds `role` in the governance registry.
    async fn has_role(
        &self,
        governance: Address,
        role: RoleId,
        identity: Address,
    ) -> Result<bool, LedgerError>;

    // ========================================================================
    // WRITE PATH (never retried blindly; outcomes are classified)
    // ========================================================================

    /// Submit a state-changing call.
    async fn submit(&self, call: Call) -> Result<TxHandle, LedgerError>;

    /// Block until the call is included or definitively rejected.
    ///
    /// # Errors
    ///
    /// `LedgerError::ConfirmationTimeout` when the wait budget elapses; the
    /// caller retries the wait rather than skipping it, since skipping would
    /// desynchronize the checkpoint from on-ledger truth.
    async fn confirm(&self, tx: TxHandle) -> Result<TxOutcome, LedgerError>;
}
