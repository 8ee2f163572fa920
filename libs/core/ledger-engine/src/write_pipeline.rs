// [libs/core/ledger-engine/src/write_pipeline.rs]
/*!
 * Bounded async write pipeline for durable-store writes off the hot path.
 *
 * The hot path never blocks on the durable store. `enqueue` is a
 * non-blocking `try_send`; a full queue is dropped with a warning, trusting
 * the reconciliation syncer to repair the resulting drift. A fixed pool of
 * workers shares one receiver behind a `tokio::sync::Mutex`, a
 * single-receiver fan-out shape suited to a small, fixed worker pool.
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use grainledger_durable_store::{DurableStoreAdapter, FinalizeWrite};
use grainledger_models::RequestRecord;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, instrument, warn};

/// Owned counterpart of `FinalizeWrite<'a>` -- the borrowed repository type
/// cannot cross the channel boundary into a worker task.
#[derive(Debug, Clone)]
pub struct FinalizationWrite {
    pub request_id: String,
    pub customer_id: String,
    pub status: String,
    pub actual_cost_grains: i64,
    pub refunded_grains: i64,
    pub reconciliation_delta_grains: i64,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub integrity_issue: Option<String>,
    pub now: DateTime<Utc>,
}

impl FinalizationWrite {
    fn as_borrowed(&self) -> FinalizeWrite<'_> {
        FinalizeWrite {
            request_id: &self.request_id,
            customer_id: &self.customer_id,
            status: &self.status,
            actual_cost_grains: self.actual_cost_grains,
            refunded_grains: self.refunded_grains,
            reconciliation_delta_grains: self.reconciliation_delta_grains,
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            integrity_issue: self.integrity_issue.as_deref(),
            now: self.now,
        }
    }
}

#[derive(Debug)]
pub enum WriteOp {
    Preflight(Box<RequestRecord>),
    Finalization(Box<FinalizationWrite>),
}

impl WriteOp {
    fn label(&self) -> &'static str {
        match self {
            WriteOp::Preflight(_) => "preflight",
            WriteOp::Finalization(_) => "finalization",
        }
    }
}

pub struct WritePipeline {
    sender: mpsc::Sender<WriteOp>,
    workers: Vec<JoinHandle<()>>,
}

impl WritePipeline {
    pub fn spawn(
        durable: Arc<dyn DurableStoreAdapter>,
        capacity: usize,
        worker_count: usize,
        retry_base: Duration,
        retry_max_attempts: u32,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..worker_count.max(1))
            .map(|worker_id| {
                let receiver = receiver.clone();
                let durable = durable.clone();
                tokio::spawn(async move {
                    loop {
                        let op = { receiver.lock().await.recv().await };
                        match op {
                            Some(op) => {
                                drain_one(&durable, op, retry_base, retry_max_attempts, worker_id).await
                            }
                            None => break,
                        }
                    }
                })
            })
            .collect();

        Self { sender, workers }
    }

    /// Non-blocking enqueue. Drops and warns on a full queue; the caller's
    /// hot path never waits on this.
    pub fn enqueue(&self, op: WriteOp) {
        let label = op.label();
        if let Err(err) = self.sender.try_send(op) {
            match err {
                mpsc::error::TrySendError::Full(_) => {
                    warn!(kind = label, "write queue full, dropping durable write");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    warn!(kind = label, "write pipeline closed, dropping durable write");
                }
            }
        }
    }

    /// Closes the queue and waits for every worker to drain. Consumes
    /// `self` so no further `enqueue` is possible.
    pub async fn close(self) {
        drop(self.sender);
        for worker in self.workers {
            if let Err(err) = worker.await {
                error!(error = %err, "write pipeline worker panicked during drain");
            }
        }
    }
}

#[instrument(skip(durable, op), fields(kind = op.label(), worker_id))]
async fn drain_one(
    durable: &Arc<dyn DurableStoreAdapter>,
    op: WriteOp,
    retry_base: Duration,
    retry_max_attempts: u32,
    worker_id: usize,
) {
    let mut attempt = 0u32;
    loop {
        let result = match &op {
            WriteOp::Preflight(record) => durable.insert_request_preflight(record).await,
            WriteOp::Finalization(write) => durable.finalize_request(write.as_borrowed()).await,
        };

        match result {
            Ok(()) => return,
            Err(err) if attempt + 1 >= retry_max_attempts => {
                error!(
                    worker_id,
                    attempt,
                    error = %err,
                    "durable write exhausted retries, relying on syncer to repair drift"
                );
                return;
            }
            Err(err) => {
                warn!(worker_id, attempt, error = %err, "durable write failed, retrying");
                tokio::time::sleep(retry_base * 2u32.pow(attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use grainledger_durable_store::{DbError, IntegrityReport};
    use grainledger_models::{Customer, ModelPricing, RequestRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingDurableStore {
        preflights: StdMutex<Vec<String>>,
        finalizations: AtomicUsize,
    }

    #[async_trait]
    impl DurableStoreAdapter for RecordingDurableStore {
        async fn insert_request_preflight(&self, record: &RequestRecord) -> Result<(), DbError> {
            self.preflights.lock().unwrap().push(record.request_id.clone());
            Ok(())
        }

        async fn finalize_request(&self, _write: FinalizeWrite<'_>) -> Result<(), DbError> {
            self.finalizations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn full_customer_scan(&self) -> Result<Vec<Customer>, DbError> {
            Ok(vec![])
        }

        async fn recently_updated_customers(&self, _since: DateTime<Utc>) -> Result<Vec<Customer>, DbError> {
            Ok(vec![])
        }

        async fn get_customer(&self, _customer_id: &str) -> Result<Option<Customer>, DbError> {
            Ok(None)
        }

        async fn sample_customers(&self, _n: usize) -> Result<Vec<Customer>, DbError> {
            Ok(vec![])
        }

        async fn current_pricing(&self, _model: &str, _provider: &str) -> Result<Option<ModelPricing>, DbError> {
            Ok(None)
        }

        async fn all_current_pricing(&self) -> Result<Vec<ModelPricing>, DbError> {
            Ok(vec![])
        }

        async fn api_key_scan(&self) -> Result<Vec<(String, String)>, DbError> {
            Ok(vec![])
        }

        async fn verify_balance_integrity(&self, _customer_id: &str) -> Result<IntegrityReport, DbError> {
            Ok(IntegrityReport { authoritative_balance_grains: 0, transaction_sum_grains: 0, delta_grains: 0, ok: true })
        }
    }

    #[tokio::test]
    async fn enqueued_preflight_reaches_the_durable_store() {
        let durable = Arc::new(RecordingDurableStore::default());
        let pipeline = WritePipeline::spawn(durable.clone(), 16, 2, Duration::from_millis(1), 3);

        let record = RequestRecord::new_preflight(
            "req_1", "cust_1", "tenant_1", "gpt-5", "openai", 1000, 900,
            serde_json::Value::Null, Utc::now(),
        );
        pipeline.enqueue(WriteOp::Preflight(Box::new(record)));
        pipeline.close().await;

        assert_eq!(durable.preflights.lock().unwrap().as_slice(), &["req_1".to_string()]);
    }

    #[tokio::test]
    async fn full_queue_drops_without_panicking() {
        let durable = Arc::new(RecordingDurableStore::default());
        let pipeline = WritePipeline::spawn(durable.clone(), 1, 0, Duration::from_millis(1), 1);
        // worker_count.max(1) still spawns one worker even when 0 is requested,
        // so give it no chance to drain before we saturate the queue.
        for i in 0..4 {
            let record = RequestRecord::new_preflight(
                format!("req_{i}"), "cust_1", "tenant_1", "gpt-5", "openai", 1000, 900,
                serde_json::Value::Null, Utc::now(),
            );
            pipeline.enqueue(WriteOp::Preflight(Box::new(record)));
        }
        pipeline.close().await;
    }
}
