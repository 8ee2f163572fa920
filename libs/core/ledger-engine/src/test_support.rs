// [libs/core/ledger-engine/src/test_support.rs]
//! In-process fakes for `HotStoreAdapter` and `DurableStoreAdapter`, the
//! same "fake the adapter, test the orchestrator" shape used by the pack's
//! `nautilus_trader` reconciliation tests. The hot-store fake re-implements
//! the three atomic scripts' logic in plain Rust behind a `Mutex` so the
//! ledger's business rules are exercised deterministically without a live
//! Redis or libSQL instance.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grainledger_durable_store::{DbError, DurableStoreAdapter, FinalizeWrite, IntegrityReport};
use grainledger_hot_store::{
    DeductCommand, DeductOutcome, FinalizeCommand, FinalizeOutcome, HotStoreAdapter, HotStoreError,
    ReserveCommand, ReserveOutcome,
};
use grainledger_models::{
    Customer, ModelPricing, RequestRecord, RequestStatus, INTEGRITY_RESERVATION_UNDERFLOW,
    INTEGRITY_UNDERCHARGE_SHORTFALL,
};

#[derive(Default)]
pub struct FakeHotStore {
    balances: Mutex<HashMap<String, i64>>,
    reserved: Mutex<HashMap<String, i64>>,
    requests: Mutex<HashMap<String, RequestRecord>>,
    api_keys: Mutex<HashMap<String, String>>,
}

impl FakeHotStore {
    pub fn set_balance(&self, customer_id: &str, balance_grains: i64) {
        self.balances.lock().unwrap().insert(customer_id.to_string(), balance_grains);
    }

    pub fn reserved_of(&self, customer_id: &str) -> i64 {
        *self.reserved.lock().unwrap().get(customer_id).unwrap_or(&0)
    }
}

#[async_trait]
impl HotStoreAdapter for FakeHotStore {
    async fn get_balance(&self, customer_id: &str) -> Result<i64, HotStoreError> {
        Ok(*self.balances.lock().unwrap().get(customer_id).unwrap_or(&0))
    }

    async fn get_reserved(&self, customer_id: &str) -> Result<i64, HotStoreError> {
        Ok(*self.reserved.lock().unwrap().get(customer_id).unwrap_or(&0))
    }

    async fn get_request_fields(&self, request_id: &str) -> Result<Option<RequestRecord>, HotStoreError> {
        Ok(self.requests.lock().unwrap().get(request_id).cloned())
    }

    async fn set_api_key_mapping(&self, key_hash: &str, tenant_id: &str) -> Result<(), HotStoreError> {
        self.api_keys.lock().unwrap().insert(key_hash.to_string(), tenant_id.to_string());
        Ok(())
    }

    async fn get_api_key_mapping(&self, key_hash: &str) -> Result<Option<String>, HotStoreError> {
        Ok(self.api_keys.lock().unwrap().get(key_hash).cloned())
    }

    async fn pipelined_bulk_set(&self, balances: &[(String, i64)]) -> Result<(), HotStoreError> {
        let mut balance_guard = self.balances.lock().unwrap();
        let mut reserved_guard = self.reserved.lock().unwrap();
        for (customer_id, balance) in balances {
            balance_guard.insert(customer_id.clone(), *balance);
            reserved_guard.entry(customer_id.clone()).or_insert(0);
        }
        Ok(())
    }

    async fn set_customer_balance(&self, customer_id: &str, balance_grains: i64) -> Result<(), HotStoreError> {
        self.balances.lock().unwrap().insert(customer_id.to_string(), balance_grains);
        Ok(())
    }

    async fn reserve(&self, cmd: ReserveCommand) -> Result<ReserveOutcome, HotStoreError> {
        let mut balances = self.balances.lock().unwrap();
        let mut reserved = self.reserved.lock().unwrap();
        let mut requests = self.requests.lock().unwrap();

        let b = *balances.entry(cmd.customer_id.clone()).or_insert(0);
        let r = *reserved.entry(cmd.customer_id.clone()).or_insert(0);

        if requests.contains_key(&cmd.request_id) {
            return Ok(ReserveOutcome {
                approved: false,
                remaining_available: b,
                rejection_reason: "REQUEST_EXISTS".to_string(),
            });
        }

        if b - r < cmd.reserved_grains {
            return Ok(ReserveOutcome {
                approved: false,
                remaining_available: b,
                rejection_reason: "INSUFFICIENT_BALANCE".to_string(),
            });
        }

        reserved.insert(cmd.customer_id.clone(), r + cmd.reserved_grains);
        requests.insert(
            cmd.request_id.clone(),
            RequestRecord::new_preflight(
                cmd.request_id.clone(),
                cmd.customer_id.clone(),
                cmd.tenant_id.clone(),
                cmd.model.clone(),
                cmd.provider.clone(),
                cmd.reserved_grains,
                cmd.estimated_grains,
                cmd.metadata.clone(),
                cmd.now,
            ),
        );

        Ok(ReserveOutcome {
            approved: true,
            remaining_available: b - r - cmd.reserved_grains,
            rejection_reason: String::new(),
        })
    }

    async fn deduct(&self, cmd: DeductCommand) -> Result<DeductOutcome, HotStoreError> {
        let mut balances = self.balances.lock().unwrap();
        let mut requests = self.requests.lock().unwrap();

        let b = *balances.entry(cmd.customer_id.clone()).or_insert(0);

        let Some(record) = requests.get_mut(&cmd.request_id) else {
            return Ok(DeductOutcome {
                success: false,
                remaining_balance: b,
                error_code: "REQUEST_NOT_FOUND".to_string(),
            });
        };

        if b < cmd.grains {
            return Ok(DeductOutcome {
                success: false,
                remaining_balance: b,
                error_code: "INSUFFICIENT_BALANCE".to_string(),
            });
        }
        if b - cmd.grains < 0 {
            return Ok(DeductOutcome {
                success: false,
                remaining_balance: b,
                error_code: "BALANCE_NEGATIVE".to_string(),
            });
        }

        let new_balance = b - cmd.grains;
        balances.insert(cmd.customer_id.clone(), new_balance);
        record.consumed_grains += cmd.grains;
        record.status = RequestStatus::Streaming;
        record.last_deduction_at = Some(cmd.now);

        Ok(DeductOutcome { success: true, remaining_balance: new_balance, error_code: String::new() })
    }

    async fn finalize(&self, cmd: FinalizeCommand) -> Result<FinalizeOutcome, HotStoreError> {
        let mut balances = self.balances.lock().unwrap();
        let mut reserved = self.reserved.lock().unwrap();
        let mut requests = self.requests.lock().unwrap();

        let Some(record) = requests.get_mut(&cmd.request_id) else {
            return Ok(FinalizeOutcome {
                success: false,
                refunded_grains: 0,
                final_balance: 0,
                error_code: "REQUEST_NOT_FOUND".to_string(),
            });
        };

        if record.status.is_terminal() {
            let b = *balances.get(&cmd.customer_id).unwrap_or(&0);
            return Ok(FinalizeOutcome { success: true, refunded_grains: 0, final_balance: b, error_code: String::new() });
        }

        let res = record.reserved_grains;
        let cons = record.consumed_grains;
        let mut b = *balances.entry(cmd.customer_id.clone()).or_insert(0);
        let refund;
        let mut integrity_issue = None;

        if cons > cmd.actual_cost_grains {
            refund = cons - cmd.actual_cost_grains;
            b += refund;
        } else if cmd.actual_cost_grains > cons {
            let extra = cmd.actual_cost_grains - cons;
            if b >= extra {
                b -= extra;
                refund = -extra;
            } else {
                refund = -b;
                b = 0;
                integrity_issue = Some(INTEGRITY_UNDERCHARGE_SHORTFALL.to_string());
            }
        } else {
            refund = 0;
        }
        balances.insert(cmd.customer_id.clone(), b);

        let r = *reserved.entry(cmd.customer_id.clone()).or_insert(0);
        if r >= res {
            reserved.insert(cmd.customer_id.clone(), r - res);
        } else {
            reserved.insert(cmd.customer_id.clone(), 0);
            integrity_issue = Some(INTEGRITY_RESERVATION_UNDERFLOW.to_string());
        }

        record.status = cmd.terminal_status;
        record.actual_cost_grains = Some(cmd.actual_cost_grains);
        record.refunded_grains = Some(refund);
        record.finalized_at = Some(cmd.now);
        if record.integrity_issue.is_none() {
            record.integrity_issue = integrity_issue;
        }

        Ok(FinalizeOutcome { success: true, refunded_grains: refund, final_balance: b, error_code: String::new() })
    }
}

#[derive(Default)]
pub struct FakeDurableStore {
    customers: Mutex<HashMap<String, Customer>>,
    pricing: Mutex<HashMap<String, ModelPricing>>,
}

impl FakeDurableStore {
    pub fn seed_customer(&self, customer: Customer) {
        self.customers.lock().unwrap().insert(customer.customer_id.clone(), customer);
    }

    pub fn seed_pricing(&self, pricing: ModelPricing) {
        self.pricing
            .lock()
            .unwrap()
            .insert(ModelPricing::cache_key(&pricing.model, &pricing.provider), pricing);
    }
}

#[async_trait]
impl DurableStoreAdapter for FakeDurableStore {
    async fn insert_request_preflight(&self, _record: &RequestRecord) -> Result<(), DbError> {
        Ok(())
    }

    async fn finalize_request(&self, _write: FinalizeWrite<'_>) -> Result<(), DbError> {
        Ok(())
    }

    async fn full_customer_scan(&self) -> Result<Vec<Customer>, DbError> {
        Ok(self.customers.lock().unwrap().values().cloned().collect())
    }

    async fn recently_updated_customers(&self, _since: DateTime<Utc>) -> Result<Vec<Customer>, DbError> {
        Ok(self.customers.lock().unwrap().values().cloned().collect())
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, DbError> {
        Ok(self.customers.lock().unwrap().get(customer_id).cloned())
    }

    async fn sample_customers(&self, n: usize) -> Result<Vec<Customer>, DbError> {
        Ok(self.customers.lock().unwrap().values().take(n).cloned().collect())
    }

    async fn current_pricing(&self, model: &str, provider: &str) -> Result<Option<ModelPricing>, DbError> {
        Ok(self.pricing.lock().unwrap().get(&ModelPricing::cache_key(model, provider)).cloned())
    }

    async fn all_current_pricing(&self) -> Result<Vec<ModelPricing>, DbError> {
        Ok(self.pricing.lock().unwrap().values().cloned().collect())
    }

    async fn api_key_scan(&self) -> Result<Vec<(String, String)>, DbError> {
        Ok(vec![])
    }

    async fn verify_balance_integrity(&self, customer_id: &str) -> Result<IntegrityReport, DbError> {
        let balance = self
            .customers
            .lock()
            .unwrap()
            .get(customer_id)
            .map(|c| c.balance_grains)
            .unwrap_or(0);
        Ok(IntegrityReport {
            authoritative_balance_grains: balance,
            transaction_sum_grains: balance,
            delta_grains: 0,
            ok: true,
        })
    }
}
