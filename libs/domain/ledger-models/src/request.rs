// [libs/domain/ledger-models/src/request.rs]
//! RequestRecord: ciclo de vida de una unica peticion de inferencia medida.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    PreflightApproved,
    Streaming,
    Completed,
    Killed,
    Failed,
    Timeout,
}

impl RequestStatus {
    /// Los estados terminales son finales -- una vez alcanzados, `finalize`
    /// es un no-op idempotente.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Completed
                | RequestStatus::Killed
                | RequestStatus::Failed
                | RequestStatus::Timeout
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::PreflightApproved => "preflight_approved",
            RequestStatus::Streaming => "streaming",
            RequestStatus::Completed => "completed",
            RequestStatus::Killed => "killed",
            RequestStatus::Failed => "failed",
            RequestStatus::Timeout => "timeout",
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "preflight_approved" => Ok(RequestStatus::PreflightApproved),
            "streaming" => Ok(RequestStatus::Streaming),
            "completed" => Ok(RequestStatus::Completed),
            "killed" => Ok(RequestStatus::Killed),
            "failed" => Ok(RequestStatus::Failed),
            "timeout" => Ok(RequestStatus::Timeout),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

/// Proyeccion en el hot-store de una peticion en curso o recien finalizada.
/// TTL de 1 hora en vuelo, extendido a 24 horas al finalizar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request_id: String,
    pub customer_id: String,
    pub tenant_id: String,
    pub model: String,
    pub provider: String,
    pub estimated_grains: i64,
    pub reserved_grains: i64,
    pub consumed_grains: i64,
    pub status: RequestStatus,
    pub actual_cost_grains: Option<i64>,
    pub refunded_grains: Option<i64>,
    pub reconciliation_delta_grains: Option<i64>,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub kill_reason: Option<String>,
    /// "undercharge_shortfall" | "reservation_underflow", set defensively.
    pub integrity_issue: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_deduction_at: Option<DateTime<Utc>>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl RequestRecord {
    pub fn new_preflight(
        request_id: impl Into<String>,
        customer_id: impl Into<String>,
        tenant_id: impl Into<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
        reserved_grains: i64,
        estimated_grains: i64,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            customer_id: customer_id.into(),
            tenant_id: tenant_id.into(),
            model: model.into(),
            provider: provider.into(),
            estimated_grains,
            reserved_grains,
            consumed_grains: 0,
            status: RequestStatus::PreflightApproved,
            actual_cost_grains: None,
            refunded_grains: None,
            reconciliation_delta_grains: None,
            prompt_tokens: None,
            completion_tokens: None,
            kill_reason: None,
            integrity_issue: None,
            metadata,
            created_at: now,
            last_deduction_at: None,
            finalized_at: None,
        }
    }
}

/// Canonical string constants for the two integrity flags finalize can set.
pub const INTEGRITY_UNDERCHARGE_SHORTFALL: &str = "undercharge_shortfall";
pub const INTEGRITY_RESERVATION_UNDERFLOW: &str = "reservation_underflow";
