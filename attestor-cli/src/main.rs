//! Attestor CLI entry point.
//!
//! Four commands drive a store migration end to end:
//! `snapshot` captures pre-upgrade attribute and slot state, `upgrade`
//! rebinds the proxy logic, `migrate` runs the resumable chunked sweep, and
//! `verify` compares current state against the stored snapshot. Any fatal
//! failure exits non-zero at the last confirmed checkpoint.

mod config;
mod error;
mod snapshot;

use attestor_core::{kinds, CoordinatorConfig, JsonFileCheckpointStore};
use attestor_ledger::{retry::with_backoff, JsonRpcLedger, LedgerClient};
use attestor_migrate::{
    identity_mapping, scanner, verify_attributes, verify_slots, CancelFlag, MigrationRun,
    SlotSnapshot, Snapshot, UpgradeExecutor,
};
use config::CliConfig;
use error::CliError;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Migrate,
    Upgrade,
    Snapshot,
    Verify,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let (command, config_path) = parse_args(std::env::args().skip(1))?;
    let config = CliConfig::load(config_path)?;
    let coordinator = config.coordinator()?;
    let ledger = JsonRpcLedger::new(
        config.rpc_endpoint.as_str(),
        config.request_timeout(),
        config.confirmation_timeout(),
    )?;

    match command {
        Command::Migrate => run_migrate(&ledger, &coordinator, &config).await,
        Command::Upgrade => run_upgrade(&ledger, &coordinator, &config).await,
        Command::Snapshot => run_snapshot(&ledger, &coordinator, &config).await,
        Command::Verify => run_verify(&ledger, &coordinator, &config).await,
    }
}

fn parse_args(
    mut args: impl Iterator<Item = String>,
) -> Result<(Command, Option<PathBuf>), CliError> {
    let mut command = None;
    let mut config_path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or(CliError::Usage)?;
                config_path = Some(PathBuf::from(path));
            }
            "migrate" | "upgrade" | "snapshot" | "verify" if command.is_none() => {
                command = Some(match arg.as_str() {
                    "migrate" => Command::Migrate,
                    "upgrade" => Command::Upgrade,
                    "snapshot" => Command::Snapshot,
                    _ => Command::Verify,
                });
            }
            other => return Err(CliError::UnknownCommand(other.to_string())),
        }
    }
    Ok((command.unwrap_or(Command::Migrate), config_path))
}

async fn run_migrate(
    ledger: &JsonRpcLedger,
    coordinator: &CoordinatorConfig,
    config: &CliConfig,
) -> Result<(), CliError> {
    let sweep = config.sweep_range()?;
    let checkpoint_store = JsonFileCheckpointStore::new(&config.checkpoint_path);
    let cancel = CancelFlag::new();
    spawn_ctrl_c_handler(cancel.clone());

    tracing::info!(%sweep, store = %coordinator.store, "starting migration sweep");
    let run = MigrationRun::new(ledger, coordinator);
    let report = run.execute(sweep, &checkpoint_store, &cancel).await?;
    tracing::info!(
        run_id = %report.run_id,
        ranges = report.ranges_processed,
        chunks = report.chunks_submitted,
        deltas = report.attribute_deltas,
        "migration sweep complete"
    );
    Ok(())
}

async fn run_upgrade(
    ledger: &JsonRpcLedger,
    coordinator: &CoordinatorConfig,
    config: &CliConfig,
) -> Result<(), CliError> {
    let new_logic = config.new_logic.ok_or(CliError::MissingNewLogic)?;
    let current = ledger
        .read_slot(coordinator.store, *attestor_core::IMPLEMENTATION_SLOT)
        .await?
        .to_address();
    let binding = attestor_core::ProxyBinding::new(coordinator.store, current);

    tracing::info!(%binding, %new_logic, "executing proxy upgrade");
    let executor = UpgradeExecutor::new(ledger, coordinator);
    let outcome = executor.upgrade(binding, new_logic).await?;
    tracing::info!(binding = %outcome.binding, block = outcome.receipt.block_number,
        "upgrade confirmed");
    Ok(())
}

/// Discover every minted account in the sweep range, one sub-range at a
/// time. Read-only, so sub-range scans retry independently.
async fn discover_accounts(
    ledger: &JsonRpcLedger,
    coordinator: &CoordinatorConfig,
    config: &CliConfig,
) -> Result<Vec<attestor_core::Address>, CliError> {
    let sweep = config.sweep_range()?;
    let mut accounts = Vec::new();
    for sub_range in sweep.split(coordinator.scan_step) {
        let found = with_backoff(&coordinator.retry, "discovery scan", || {
            scanner::scan(ledger, coordinator.store, sub_range)
        })
        .await?;
        accounts.extend(found);
    }
    Ok(accounts)
}

async fn run_snapshot(
    ledger: &JsonRpcLedger,
    coordinator: &CoordinatorConfig,
    config: &CliConfig,
) -> Result<(), CliError> {
    let accounts = discover_accounts(ledger, coordinator, config).await?;
    let attributes =
        Snapshot::collect(ledger, coordinator.store, &accounts, &kinds::standard()).await?;
    let slots = SlotSnapshot::collect(ledger, coordinator.store, &config.declared_slots).await?;
    let head = ledger.latest_block().await?;

    let persisted = snapshot::PersistedSnapshot::from_views(head, accounts, &attributes, &slots);
    snapshot::save(&config.snapshot_path, &persisted)?;
    tracing::info!(
        path = %config.snapshot_path.display(),
        accounts = persisted.accounts.len(),
        records = persisted.attributes.len(),
        "snapshot captured"
    );
    Ok(())
}

/// Compare current state against the stored pre-upgrade snapshot.
///
/// Run after a complete sweep: every account in the snapshot is expected to
/// be migrated, and the migration is layout-only, so records must carry
/// over unchanged and declared slots must be byte-identical.
async fn run_verify(
    ledger: &JsonRpcLedger,
    coordinator: &CoordinatorConfig,
    config: &CliConfig,
) -> Result<(), CliError> {
    let persisted =
        snapshot::load(&config.snapshot_path)?.ok_or_else(|| CliError::MissingSnapshot {
            path: config.snapshot_path.display().to_string(),
        })?;

    let pre_attributes = persisted.attribute_snapshot();
    let pre_slots = persisted.slot_snapshot();
    let post_attributes = Snapshot::collect(
        ledger,
        coordinator.store,
        &persisted.accounts,
        &kinds::standard(),
    )
    .await?;
    let post_slots = SlotSnapshot::collect(ledger, coordinator.store, &config.declared_slots).await?;

    let migrated: BTreeSet<_> = persisted.accounts.iter().copied().collect();
    verify_attributes(&pre_attributes, &post_attributes, &migrated, identity_mapping)?;
    verify_slots(&pre_slots, &post_slots)?;
    tracing::info!(
        accounts = migrated.len(),
        slots = persisted.slots.len(),
        "verification passed"
    );
    Ok(())
}

fn spawn_ctrl_c_handler(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the in-flight chunk");
            cancel.cancel();
        }
    });
}
