// [libs/core/ledger-engine/src/ledger.rs]
/*!
 * =================================================================
 * APARATO: RESERVATION LEDGER (V1.0)
 * CLASIFICACION: DOMAIN ORCHESTRATOR (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO PUBLICO DEL RESERVATION LEDGER
 *
 * Un unico round-trip al hot store por metodo publico; las escrituras
 * durables se despachan al pipeline asincrono y nunca bloquean al
 * llamador. El pricing cache se alimenta al arranque y en cada miss.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use grainledger_durable_store::DurableStoreAdapter;
use grainledger_hot_store::{
    DeductCommand, FinalizeCommand, HotStoreAdapter, ReserveCommand,
};
use grainledger_models::{Customer, LedgerError, LedgerResult, ModelPricing, RequestStatus};
use serde_json::Value;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::pricing_cache::PricingCache;
use crate::write_pipeline::{FinalizationWrite, WriteOp, WritePipeline};

#[derive(Debug, Clone, PartialEq)]
pub struct ReservationOutcome {
    pub approved: bool,
    pub remaining_available: i64,
    pub rejection_reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeductionOutcome {
    pub success: bool,
    pub remaining_balance: i64,
    pub error_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalizationOutcome {
    pub success: bool,
    pub refunded_grains: i64,
    pub final_balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceView {
    pub balance: i64,
    pub reserved: i64,
    pub available: i64,
}

/// Inputs `Finalize` needs beyond the request id.
pub struct FinalizeRequest<'a> {
    pub customer_id: &'a str,
    pub request_id: &'a str,
    pub status: RequestStatus,
    pub actual_cost_grains: i64,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

pub struct ReservationLedger {
    hot: Arc<dyn HotStoreAdapter>,
    durable: Arc<dyn DurableStoreAdapter>,
    pricing: PricingCache,
    writes: WritePipeline,
}

impl ReservationLedger {
    /// Builds the ledger and blocks briefly to warm the pricing cache from
    /// the durable store, following a load-once, refresh-on-miss startup
    /// discipline.
    pub async fn bootstrap(
        hot: Arc<dyn HotStoreAdapter>,
        durable: Arc<dyn DurableStoreAdapter>,
        write_queue_capacity: usize,
        write_worker_count: usize,
        retry_base: Duration,
        retry_max_attempts: u32,
    ) -> LedgerResult<Self> {
        let pricing = PricingCache::new();
        let rows = durable
            .all_current_pricing()
            .await
            .map_err(|e| LedgerError::DurableStoreFault(e.to_string()))?;
        info!(count = rows.len(), "pricing cache warmed from durable store");
        pricing.bulk_load(rows);

        let writes = WritePipeline::spawn(
            durable.clone(),
            write_queue_capacity,
            write_worker_count,
            retry_base,
            retry_max_attempts,
        );

        Ok(Self { hot, durable, pricing, writes })
    }

    #[instrument(skip(self, cancel, metadata), fields(customer_id = %customer_id, request_id = %request_id))]
    pub async fn check_and_reserve(
        &self,
        customer_id: &str,
        tenant_id: &str,
        request_id: &str,
        model: &str,
        provider: &str,
        reserved_grains: i64,
        estimated_grains: i64,
        metadata: Value,
        cancel: &CancellationToken,
    ) -> LedgerResult<ReservationOutcome> {
        require_non_empty(customer_id, "customer_id")?;
        require_non_empty(request_id, "request_id")?;
        require_positive(reserved_grains, "reserved_grains")?;
        if estimated_grains < 0 {
            return Err(LedgerError::InvalidArgument("estimated_grains must be non-negative".into()));
        }

        let now = Utc::now();
        let cmd = ReserveCommand {
            customer_id: customer_id.to_string(),
            tenant_id: tenant_id.to_string(),
            request_id: request_id.to_string(),
            model: model.to_string(),
            provider: provider.to_string(),
            reserved_grains,
            estimated_grains,
            metadata: metadata.clone(),
            now,
        };

        let outcome = self.dispatch(cancel, self.hot.reserve(cmd)).await?;

        if outcome.approved {
            info!(remaining_available = outcome.remaining_available, "reservation approved");
            let record = grainledger_models::RequestRecord::new_preflight(
                request_id, customer_id, tenant_id, model, provider,
                reserved_grains, estimated_grains, metadata, now,
            );
            self.writes.enqueue(WriteOp::Preflight(Box::new(record)));
        } else {
            info!(reason = %outcome.rejection_reason, "reservation rejected");
        }

        Ok(ReservationOutcome {
            approved: outcome.approved,
            remaining_available: outcome.remaining_available,
            rejection_reason: outcome.rejection_reason,
        })
    }

    #[instrument(skip(self, cancel), fields(customer_id = %customer_id, request_id = %request_id))]
    pub async fn deduct(
        &self,
        customer_id: &str,
        request_id: &str,
        grain_amount: i64,
        tokens_consumed: u64,
        cancel: &CancellationToken,
    ) -> LedgerResult<DeductionOutcome> {
        require_non_empty(customer_id, "customer_id")?;
        require_non_empty(request_id, "request_id")?;
        require_positive(grain_amount, "grain_amount")?;

        let cmd = DeductCommand {
            customer_id: customer_id.to_string(),
            request_id: request_id.to_string(),
            grains: grain_amount,
            tokens_consumed,
            now: Utc::now(),
        };

        let outcome = self.dispatch(cancel, self.hot.deduct(cmd)).await?;

        if outcome.is_kill_signal() {
            warn!(error_code = %outcome.error_code, "kill switch: stop streaming now");
        } else if !outcome.success {
            warn!(error_code = %outcome.error_code, "deduct rejected");
        } else {
            debug!(remaining_balance = outcome.remaining_balance, "deduct applied");
        }

        Ok(DeductionOutcome {
            success: outcome.success,
            remaining_balance: outcome.remaining_balance,
            error_code: outcome.error_code,
        })
    }

    #[instrument(skip(self, request, cancel), fields(customer_id = %request.customer_id, request_id = %request.request_id))]
    pub async fn finalize(
        &self,
        request: FinalizeRequest<'_>,
        cancel: &CancellationToken,
    ) -> LedgerResult<FinalizationOutcome> {
        require_non_empty(request.customer_id, "customer_id")?;
        require_non_empty(request.request_id, "request_id")?;
        if !request.status.is_terminal() {
            return Err(LedgerError::InvalidArgument(
                "finalize requires a terminal status".into(),
            ));
        }

        let now = Utc::now();
        let cmd = FinalizeCommand {
            customer_id: request.customer_id.to_string(),
            request_id: request.request_id.to_string(),
            actual_cost_grains: request.actual_cost_grains,
            terminal_status: request.status,
            now,
        };

        let outcome = self.dispatch(cancel, self.hot.finalize(cmd)).await?;

        if outcome.success {
            debug!(refunded_grains = outcome.refunded_grains, "finalize settled");
            let integrity_issue = self
                .hot
                .get_request_fields(request.request_id)
                .await
                .ok()
                .flatten()
                .and_then(|record| record.integrity_issue);
            if let Some(flag) = &integrity_issue {
                warn!(flag = %flag, "finalize recorded an integrity flag");
            }

            let write = FinalizationWrite {
                request_id: request.request_id.to_string(),
                customer_id: request.customer_id.to_string(),
                status: request.status.as_str().to_string(),
                actual_cost_grains: request.actual_cost_grains,
                refunded_grains: outcome.refunded_grains,
                reconciliation_delta_grains: outcome.refunded_grains,
                prompt_tokens: request.prompt_tokens,
                completion_tokens: request.completion_tokens,
                integrity_issue,
                now,
            };
            self.writes.enqueue(WriteOp::Finalization(Box::new(write)));
        } else {
            warn!(error_code = %outcome.error_code, "finalize failed");
        }

        Ok(FinalizationOutcome {
            success: outcome.success,
            refunded_grains: outcome.refunded_grains,
            final_balance: outcome.final_balance,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_balance(&self, customer_id: &str) -> LedgerResult<BalanceView> {
        require_non_empty(customer_id, "customer_id")?;
        let balance = self.hot.get_balance(customer_id).await.map_err(LedgerError::from)?;
        let reserved = self.hot.get_reserved(customer_id).await.map_err(LedgerError::from)?;
        Ok(BalanceView { balance, reserved, available: balance - reserved })
    }

    #[instrument(skip(self))]
    pub async fn get_model_pricing(&self, model: &str, provider: &str) -> LedgerResult<ModelPricing> {
        if let Some(pricing) = self.pricing.get(model, provider) {
            return Ok(pricing);
        }

        debug!(model, provider, "pricing cache miss, falling through to durable store");
        let pricing = self
            .durable
            .current_pricing(model, provider)
            .await
            .map_err(|e| LedgerError::DurableStoreFault(e.to_string()))?
            .ok_or_else(|| LedgerError::PricingNotFound {
                model: model.to_string(),
                provider: provider.to_string(),
            })?;

        self.pricing.insert(pricing.clone());
        Ok(pricing)
    }

    #[instrument(skip(self))]
    pub async fn get_customer_profile(&self, customer_id: &str) -> LedgerResult<Option<Customer>> {
        require_non_empty(customer_id, "customer_id")?;
        self.durable
            .get_customer(customer_id)
            .await
            .map_err(|e| LedgerError::DurableStoreFault(e.to_string()))
    }

    /// Drains the write pipeline and returns once every queued durable
    /// write has been attempted.
    pub async fn close(self) {
        self.writes.close().await;
    }

    /// Every public method suspends at exactly one hot-store round trip;
    /// cancellation before that future resolves returns `Cancelled` with
    /// no effect on balances.
    async fn dispatch<T, E>(
        &self,
        cancel: &CancellationToken,
        fut: impl std::future::Future<Output = Result<T, E>>,
    ) -> LedgerResult<T>
    where
        E: Into<grainledger_hot_store::HotStoreError>,
    {
        select! {
            biased;
            _ = cancel.cancelled() => Err(LedgerError::Cancelled),
            result = fut => result.map_err(|e| e.into().into()),
        }
    }
}

fn require_non_empty(value: &str, field: &str) -> LedgerResult<()> {
    if value.is_empty() {
        return Err(LedgerError::InvalidArgument(format!("{field} is required")));
    }
    Ok(())
}

fn require_positive(value: i64, field: &str) -> LedgerResult<()> {
    if value <= 0 {
        return Err(LedgerError::InvalidArgument(format!("{field} must be positive")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeDurableStore, FakeHotStore};

    fn ledger_with(hot: FakeHotStore, durable: FakeDurableStore) -> ReservationLedger {
        let durable: Arc<dyn DurableStoreAdapter> = Arc::new(durable);
        ReservationLedger {
            hot: Arc::new(hot),
            durable: durable.clone(),
            pricing: PricingCache::new(),
            writes: WritePipeline::spawn(durable, 16, 1, Duration::from_millis(1), 1),
        }
    }

    #[tokio::test]
    async fn invalid_argument_rejects_before_touching_state() {
        let hot = FakeHotStore::default();
        let durable = FakeDurableStore::default();
        let ledger = ledger_with(hot, durable);

        let cancel = CancellationToken::new();
        let err = ledger
            .check_and_reserve("", "tenant_1", "req_1", "gpt-5", "openai", 1000, 900, Value::Null, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn cancellation_before_dispatch_has_no_effect() {
        let hot = FakeHotStore::default();
        hot.set_balance("cust_1", 100_000_000);
        let durable = FakeDurableStore::default();
        let ledger = ledger_with(hot, durable);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ledger
            .check_and_reserve("cust_1", "tenant_1", "req_1", "gpt-5", "openai", 1000, 900, Value::Null, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Cancelled));
        assert_eq!(ledger.hot.get_balance("cust_1").await.unwrap(), 100_000_000);
    }
}
