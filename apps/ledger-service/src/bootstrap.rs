// [apps/ledger-service/src/bootstrap.rs]
/*!
 * Composition root: wires the hot store, the durable store, the
 * Reservation Ledger and the Reconciliation Syncer together, then runs
 * until a shutdown signal arrives. No RPC/HTTP surface is started here --
 * that collaborator lives outside this process.
 */

use std::sync::Arc;

use grainledger_core::{GrainLedgerConfig, ReservationLedger};
use grainledger_durable_store::{DurableStoreAdapter, LedgerDbClient, LibsqlDurableStore};
use grainledger_hot_store::{HotStoreAdapter, RedisHotStore};
use grainledger_reconciliation::ReconciliationSyncer;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run() -> anyhow::Result<()> {
    let config = GrainLedgerConfig::from_env();
    info!(environment = %config.environment, "grain ledger starting");

    let hot_store: Arc<dyn HotStoreAdapter> = Arc::new(
        RedisHotStore::connect(&config.hot_store_address, config.hot_store_password.as_deref()).await?,
    );

    let db_client = LedgerDbClient::connect(
        &config.durable_store_url,
        config.durable_store_token.clone(),
    )
    .await?;
    let durable_store: Arc<dyn DurableStoreAdapter> = Arc::new(LibsqlDurableStore::new(db_client));

    let syncer = Arc::new(ReconciliationSyncer::new(hot_store.clone(), durable_store.clone()));
    syncer.initialize_hot_store().await?;

    let ledger = ReservationLedger::bootstrap(
        hot_store,
        durable_store,
        config.write_queue_capacity,
        config.write_worker_count,
        config.retry_base,
        config.retry_max_attempts,
    )
    .await?;

    let shutdown = CancellationToken::new();
    let drift_task = syncer.clone().spawn_periodic(config.sync_interval, shutdown.clone());

    info!("grain ledger ready, awaiting shutdown signal");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining in-flight work");

    shutdown.cancel();
    drift_task.await?;
    ledger.close().await;

    info!("grain ledger shut down cleanly");
    Ok(())
}
