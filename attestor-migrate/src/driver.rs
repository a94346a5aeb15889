//! Migration batch driver.
//!
//! Drives state-changing migration calls for a discovered account sequence
//! in fixed-size chunks: strictly sequential, at most one call in flight,
//! checkpoint saved after every confirmed chunk. The driver itself is
//! stateless between invocations; the checkpoint carries all resume state.

use attestor_core::{
    Address, CheckpointStore, ChunkPlan, CoordinatorConfig, MigrationCheckpoint, MigrationError,
};
use attestor_ledger::{retry::with_backoff, Call, CallAction, LedgerClient, RevertReason, TxOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation, checked between chunks. An in-flight
/// confirmation is never abandoned: cancelling takes effect before the next
/// submission.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where the driver is in its submit/confirm cycle.
///
/// Modelled as an explicit machine so cancellation and timeout handling are
/// first-class transitions rather than side effects of suspension syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPhase {
    Idle,
    AwaitingConfirmation { chunk: u64 },
    Failed { chunk: u64 },
}

/// Outcome of one driver invocation over a single discovery range.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Chunks confirmed during this invocation.
    pub chunks_submitted: u64,
    /// Attribute deltas the confirmed receipts report. Zero for a rerun
    /// over already-migrated accounts.
    pub attribute_deltas: u64,
    /// Checkpoint after the last confirmed chunk.
    pub checkpoint: MigrationCheckpoint,
}

/// Sequential chunk submitter.
pub struct BatchDriver<'a, C: LedgerClient + ?Sized> {
    client: &'a C,
    config: &'a CoordinatorConfig,
    phase: DriverPhase,
}

impl<'a, C: LedgerClient + ?Sized> BatchDriver<'a, C> {
    pub fn new(client: &'a C, config: &'a CoordinatorConfig) -> Self {
        Self {
            client,
            config,
            phase: DriverPhase::Idle,
        }
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    /// Drive migration calls for `accounts`, resuming at
    /// `checkpoint.next_chunk`.
    ///
    /// The account sequence must be the deterministic discovery output for
    /// `checkpoint.range`: chunk boundaries are re-derived from it, so a
    /// resumed invocation sees exactly the chunks the interrupted one did.
    ///
    /// # Errors
    ///
    /// - `MigrationError::Unauthorized` when a chunk reverts for a missing
    ///   role; the checkpoint is not advanced.
    /// - `MigrationError::CallRejected` for any other revert; the checkpoint
    ///   is not advanced past the failing chunk.
    /// - `MigrationError::Ledger` when the transient-retry budget is spent.
    /// - `MigrationError::Cancelled` when the flag is raised between chunks.
    pub async fn run(
        &mut self,
        accounts: &[Address],
        checkpoint: MigrationCheckpoint,
        store: &dyn CheckpointStore,
        cancel: &CancelFlag,
    ) -> Result<RunReport, MigrationError> {
        let client = self.client;
        let plan = ChunkPlan::new(accounts.len() as u64, self.config.chunk_size);
        let mut checkpoint = checkpoint;
        let mut report = RunReport {
            chunks_submitted: 0,
            attribute_deltas: 0,
            checkpoint: checkpoint.clone(),
        };

        for index in checkpoint.next_chunk..plan.count() {
            if cancel.is_cancelled() {
                self.phase = DriverPhase::Idle;
                return Err(MigrationError::Cancelled { chunk_index: index });
            }
            let chunk = plan
                .slice(accounts, index)
                .expect("chunk index bounded by plan count");
            let call = Call {
                contract: self.config.store,
                from: self.config.identity,
                action: CallAction::MigrateAttributes(chunk.to_vec()),
            };

            self.phase = DriverPhase::AwaitingConfirmation { chunk: index };
            // Submit and confirm as one retriable unit: resubmitting after a
            // transient failure is safe because the entry point is
            // idempotent per account.
            let outcome = with_backoff(&self.config.retry, "migrateAttributes", || {
                let call = call.clone();
                async move {
                    let tx = client.submit(call).await?;
                    client.confirm(tx).await
                }
            })
            .await;

            match outcome {
                Ok(TxOutcome::Confirmed(receipt)) => {
                    checkpoint.record_chunk(chunk.len() as u64);
                    store.save(&checkpoint)?;
                    report.chunks_submitted += 1;
                    report.attribute_deltas += receipt.migrated;
                    tracing::info!(
                        chunk = index,
                        accounts = chunk.len(),
                        deltas = receipt.migrated,
                        percent = (index + 1) * 100 / plan.count(),
                        range = %checkpoint.range,
                        "chunk confirmed"
                    );
                }
                Ok(TxOutcome::Reverted(RevertReason::MissingRole)) => {
                    self.phase = DriverPhase::Failed { chunk: index };
                    return Err(MigrationError::Unauthorized {
                        identity: self.config.identity,
                    });
                }
                Ok(TxOutcome::Reverted(RevertReason::Message(reason))) => {
                    self.phase = DriverPhase::Failed { chunk: index };
                    return Err(MigrationError::CallRejected {
                        chunk_index: index,
                        reason,
                    });
                }
                Err(err) => {
                    self.phase = DriverPhase::Failed { chunk: index };
                    return Err(MigrationError::Ledger(err));
                }
            }
        }

        self.phase = DriverPhase::Idle;
        report.checkpoint = checkpoint;
        Ok(report)
    }
}
