//! Resumable migration sweep.
//!
//! Glues discovery, chunk driving, and checkpointing into the operator-level
//! operation: sweep a block range in fixed-size sub-ranges, migrating every
//! account discovered in each. Safe to re-run after a crash or a fatal
//! failure: the persisted checkpoint marks the sub-range and chunk where
//! work resumes, and re-processing is absorbed by the migration entry
//! point's idempotence.

use crate::driver::{BatchDriver, CancelFlag};
use crate::scanner;
use attestor_core::{
    BlockRange, CheckpointError, CheckpointStore, CoordinatorConfig, MigrationCheckpoint,
    MigrationError,
};
use attestor_ledger::{retry::with_backoff, LedgerClient};
use uuid::Uuid;

/// Outcome of a completed sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub run_id: Uuid,
    pub ranges_processed: u64,
    pub chunks_submitted: u64,
    pub attribute_deltas: u64,
    pub checkpoint: MigrationCheckpoint,
}

/// Coordinator for one full migration sweep.
pub struct MigrationRun<'a, C: LedgerClient + ?Sized> {
    client: &'a C,
    config: &'a CoordinatorConfig,
}

impl<'a, C: LedgerClient + ?Sized> MigrationRun<'a, C> {
    pub fn new(client: &'a C, config: &'a CoordinatorConfig) -> Self {
        Self { client, config }
    }

    /// Sweep `range`, resuming from the stored checkpoint if one exists.
    ///
    /// Sub-ranges are processed strictly in order; a stored checkpoint must
    /// align with the sweep's sub-range boundaries (same range, same scan
    /// step), otherwise the run refuses to guess and fails with a checkpoint
    /// error. On fatal failure the sweep stops at the last confirmed
    /// checkpoint; the error names the failing chunk or range.
    pub async fn execute(
        &self,
        range: BlockRange,
        checkpoint_store: &dyn CheckpointStore,
        cancel: &CancelFlag,
    ) -> Result<SweepReport, MigrationError> {
        let sub_ranges = range.split(self.config.scan_step);

        let checkpoint = match checkpoint_store.load()? {
            Some(loaded) => {
                if !sub_ranges.iter().any(|sub| *sub == loaded.range) {
                    return Err(CheckpointError::MisalignedRange {
                        start: loaded.range.start,
                    }
                    .into());
                }
                tracing::info!(run_id = %loaded.run_id, range = %loaded.range,
                    chunk = loaded.next_chunk, "resuming sweep from checkpoint");
                loaded
            }
            None => {
                let first = sub_ranges.first().copied().unwrap_or(range);
                let fresh = MigrationCheckpoint::new(Uuid::now_v7(), first);
                checkpoint_store.save(&fresh)?;
                fresh
            }
        };

        let mut report = SweepReport {
            run_id: checkpoint.run_id,
            ranges_processed: 0,
            chunks_submitted: 0,
            attribute_deltas: 0,
            checkpoint,
        };
        let total = sub_ranges.len() as u64;

        for (position, sub_range) in sub_ranges.into_iter().enumerate() {
            // Sub-ranges before the checkpoint are already confirmed.
            if sub_range.start < report.checkpoint.range.start {
                continue;
            }
            if sub_range.start > report.checkpoint.range.start {
                report.checkpoint.advance_range(sub_range)?;
                checkpoint_store.save(&report.checkpoint)?;
            }

            let client = self.client;
            let store = self.config.store;
            let accounts = with_backoff(&self.config.retry, "discovery scan", || {
                scanner::scan(client, store, sub_range)
            })
            .await
            .map_err(MigrationError::Ledger)?;

            let mut driver = BatchDriver::new(self.client, self.config);
            let run = driver
                .run(&accounts, report.checkpoint.clone(), checkpoint_store, cancel)
                .await?;

            report.checkpoint = run.checkpoint;
            report.chunks_submitted += run.chunks_submitted;
            report.attribute_deltas += run.attribute_deltas;
            report.ranges_processed += 1;
            tracing::info!(
                range = %sub_range,
                discovered = accounts.len(),
                percent = (position as u64 + 1) * 100 / total,
                "sub-range complete"
            );
        }

        Ok(report)
    }
}
