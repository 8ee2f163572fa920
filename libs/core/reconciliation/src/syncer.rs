// [libs/core/reconciliation/src/syncer.rs]
/*!
 * =================================================================
 * APARATO: RECONCILIATION SYNCER (V1.0)
 * CLASIFICACION: DOMAIN ORCHESTRATOR (ESTRATO L2)
 * RESPONSABILIDAD: SINCRONIZACION ENTRE EL HOT STORE Y EL DURABLE STORE
 *
 * El almacen durable es la unica fuente autoritativa; este aparato
 * mantiene el replica caliente al dia mediante tres rutinas: arranque
 * en bloque, correccion periodica de deriva, y verificacion de
 * integridad bajo demanda. Nunca toca `reserved` salvo en el arranque
 * -- ese contador solo lo muta el ledger.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use grainledger_durable_store::DurableStoreAdapter;
use grainledger_hot_store::HotStoreAdapter;
use grainledger_models::{LedgerError, LedgerResult};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Batch size for the bootstrap's bulk hot-store load.
const BOOTSTRAP_BATCH_SIZE: usize = 1000;
/// Drift correction only refreshes customers touched in the last hour.
fn drift_window() -> ChronoDuration {
    ChronoDuration::hours(1)
}

pub struct ReconciliationSyncer {
    hot: Arc<dyn HotStoreAdapter>,
    durable: Arc<dyn DurableStoreAdapter>,
}

impl ReconciliationSyncer {
    pub fn new(hot: Arc<dyn HotStoreAdapter>, durable: Arc<dyn DurableStoreAdapter>) -> Self {
        Self { hot, durable }
    }

    /// `InitializeHotStore`: streams every customer balance from the durable
    /// store and loads it into the hot store in batches of 1000, seeding
    /// `reserved` to zero for any customer not already tracked. Also loads
    /// API-key mappings. Blocking by design -- run once at process startup
    /// before traffic is accepted.
    #[instrument(skip(self))]
    pub async fn initialize_hot_store(&self) -> LedgerResult<()> {
        let customers = self
            .durable
            .full_customer_scan()
            .await
            .map_err(|e| LedgerError::DurableStoreFault(e.to_string()))?;

        for chunk in customers.chunks(BOOTSTRAP_BATCH_SIZE) {
            let batch: Vec<(String, i64)> =
                chunk.iter().map(|c| (c.customer_id.clone(), c.balance_grains)).collect();
            self.hot.pipelined_bulk_set(&batch).await.map_err(LedgerError::from)?;
        }
        info!(customers = customers.len(), "hot store bootstrapped from durable store");

        let api_keys = self
            .durable
            .api_key_scan()
            .await
            .map_err(|e| LedgerError::DurableStoreFault(e.to_string()))?;
        for (key_hash, tenant_id) in &api_keys {
            self.hot.set_api_key_mapping(key_hash, tenant_id).await.map_err(LedgerError::from)?;
        }
        info!(api_keys = api_keys.len(), "api key mappings loaded into hot store");

        Ok(())
    }

    /// One pass of periodic drift correction: overwrite the hot-store
    /// balance for every customer updated within the last hour. `reserved`
    /// is never touched here -- only the ledger mutates that counter.
    #[instrument(skip(self))]
    pub async fn correct_drift_once(&self) -> LedgerResult<usize> {
        let since = Utc::now() - drift_window();
        let customers = self
            .durable
            .recently_updated_customers(since)
            .await
            .map_err(|e| LedgerError::DurableStoreFault(e.to_string()))?;

        for customer in &customers {
            self.hot
                .set_customer_balance(&customer.customer_id, customer.balance_grains)
                .await
                .map_err(LedgerError::from)?;
        }
        if !customers.is_empty() {
            info!(count = customers.len(), "drift correction refreshed recently-updated customers");
        }
        Ok(customers.len())
    }

    /// Spawns the periodic drift-correction loop on a background task using
    /// `tokio::time::interval` rather than a raw sleep, so ticks do not
    /// accumulate drift from the correction work itself. Runs until
    /// `cancel` fires.
    pub fn spawn_periodic(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = self.correct_drift_once().await {
                            warn!(error = %err, "periodic drift correction failed, will retry next tick");
                        }
                    }
                }
            }
        })
    }

    /// `Integrity check`: samples N customers uniformly, compares hot-store
    /// balance against the durable authoritative balance, logs and repairs
    /// every mismatch, and returns the discrepancy count.
    #[instrument(skip(self))]
    pub async fn check_integrity(&self, sample_size: usize) -> LedgerResult<usize> {
        let customers = self
            .durable
            .sample_customers(sample_size)
            .await
            .map_err(|e| LedgerError::DurableStoreFault(e.to_string()))?;

        let mut discrepancies = 0;
        for customer in &customers {
            let hot_balance = self.hot.get_balance(&customer.customer_id).await.map_err(LedgerError::from)?;
            if hot_balance != customer.balance_grains {
                warn!(
                    customer_id = %customer.customer_id,
                    hot_balance,
                    durable_balance = customer.balance_grains,
                    "integrity mismatch detected, repairing hot store"
                );
                self.hot
                    .set_customer_balance(&customer.customer_id, customer.balance_grains)
                    .await
                    .map_err(LedgerError::from)?;
                discrepancies += 1;
            }
        }
        Ok(discrepancies)
    }

    /// `SyncCustomer`: targeted repair for a single customer, used when an
    /// integrity flag appears on a request record.
    #[instrument(skip(self))]
    pub async fn sync_customer(&self, customer_id: &str) -> LedgerResult<()> {
        let customer = self
            .durable
            .get_customer(customer_id)
            .await
            .map_err(|e| LedgerError::DurableStoreFault(e.to_string()))?
            .ok_or_else(|| LedgerError::InvalidArgument(format!("unknown customer {customer_id}")))?;

        self.hot
            .set_customer_balance(&customer.customer_id, customer.balance_grains)
            .await
            .map_err(LedgerError::from)?;
        info!(customer_id = %customer_id, "targeted repair applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grainledger_core::test_support::{FakeDurableStore, FakeHotStore};
    use grainledger_models::{BufferStrategy, Customer};

    fn customer(id: &str, balance: i64) -> Customer {
        Customer {
            customer_id: id.to_string(),
            tenant_id: "tenant_1".to_string(),
            balance_grains: balance,
            lifetime_spent_grains: 0,
            default_buffer_strategy: BufferStrategy::Conservative,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn bootstrap_loads_canonical_balance_key() {
        let hot = Arc::new(FakeHotStore::default());
        let durable = Arc::new(FakeDurableStore::default());
        durable.seed_customer(customer("cust_1", 42_000));

        let syncer = ReconciliationSyncer::new(hot.clone(), durable);
        syncer.initialize_hot_store().await.unwrap();

        assert_eq!(hot.get_balance("cust_1").await.unwrap(), 42_000);
        assert_eq!(hot.reserved_of("cust_1"), 0);
    }

    #[tokio::test]
    async fn integrity_check_repairs_mismatch() {
        let hot = Arc::new(FakeHotStore::default());
        hot.set_balance("cust_1", 10);
        let durable = Arc::new(FakeDurableStore::default());
        durable.seed_customer(customer("cust_1", 500));

        let syncer = ReconciliationSyncer::new(hot.clone(), durable);
        let discrepancies = syncer.check_integrity(10).await.unwrap();

        assert_eq!(discrepancies, 1);
        assert_eq!(hot.get_balance("cust_1").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn sync_customer_repairs_a_single_balance() {
        let hot = Arc::new(FakeHotStore::default());
        hot.set_balance("cust_1", 10);
        let durable = Arc::new(FakeDurableStore::default());
        durable.seed_customer(customer("cust_1", 777));

        let syncer = ReconciliationSyncer::new(hot.clone(), durable);
        syncer.sync_customer("cust_1").await.unwrap();

        assert_eq!(hot.get_balance("cust_1").await.unwrap(), 777);
    }
}
