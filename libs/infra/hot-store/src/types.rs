// [libs/infra/hot-store/src/types.rs]
//! Typed request/outcome payloads for the three atomic scripts.

use chrono::{DateTime, Utc};
use grainledger_models::RequestStatus;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ReserveCommand {
    pub customer_id: String,
    pub tenant_id: String,
    pub request_id: String,
    pub model: String,
    pub provider: String,
    pub reserved_grains: i64,
    pub estimated_grains: i64,
    pub metadata: Value,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveOutcome {
    pub approved: bool,
    /// `balance - reserved - reserved_grains` on approval, current balance on rejection.
    pub remaining_available: i64,
    /// Empty string on approval, else one of `REQUEST_EXISTS` | `INSUFFICIENT_BALANCE`.
    pub rejection_reason: String,
}

#[derive(Debug, Clone)]
pub struct DeductCommand {
    pub customer_id: String,
    pub request_id: String,
    pub grains: i64,
    pub tokens_consumed: u64,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeductOutcome {
    pub success: bool,
    pub remaining_balance: i64,
    /// Empty on success, else `REQUEST_NOT_FOUND` | `INSUFFICIENT_BALANCE` | `BALANCE_NEGATIVE`.
    /// The first two are kill-switch signals.
    pub error_code: String,
}

impl DeductOutcome {
    pub fn is_kill_signal(&self) -> bool {
        self.error_code == "REQUEST_NOT_FOUND" || self.error_code == "INSUFFICIENT_BALANCE"
    }
}

#[derive(Debug, Clone)]
pub struct FinalizeCommand {
    pub customer_id: String,
    pub request_id: String,
    pub actual_cost_grains: i64,
    pub terminal_status: RequestStatus,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub success: bool,
    /// Positive = refund to customer, negative = extra charge absorbed.
    pub refunded_grains: i64,
    pub final_balance: i64,
    /// Empty on success, else `REQUEST_NOT_FOUND`.
    pub error_code: String,
}
