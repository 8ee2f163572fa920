// [libs/infra/hot-store/src/client.rs]
/*!
 * =================================================================
 * APARATO: HOT STORE CLIENT (V1.0)
 * CLASIFICACION: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENLACE MULTIPLEXADO CONTRA EL ALMACEN CALIENTE
 *
 * Envuelve `redis::aio::ConnectionManager`, que ya multiplexa muchas
 * invocaciones logicas sobre una unica conexion fisica -- la forma
 * idiomatica de este ecosistema de sostener alta concurrencia de
 * solicitudes sin mantener un pool literal de sockets.
 * =================================================================
 */

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grainledger_models::{RequestRecord, RequestStatus};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, error, instrument, warn};

use crate::errors::HotStoreError;
use crate::keys::{apikey_key, balance_key, request_key, reserved_key};
use crate::scripts::ScriptSet;
use crate::types::{
    DeductCommand, DeductOutcome, FinalizeCommand, FinalizeOutcome, ReserveCommand,
    ReserveOutcome,
};

/// Connect timeout budget: ~10ms.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(10);
/// Read/write timeout budget: ~20ms.
const OPERATION_TIMEOUT: Duration = Duration::from_millis(20);

#[async_trait]
pub trait HotStoreAdapter: Send + Sync {
    async fn get_balance(&self, customer_id: &str) -> Result<i64, HotStoreError>;
    async fn get_reserved(&self, customer_id: &str) -> Result<i64, HotStoreError>;
    async fn get_request_fields(
        &self,
        request_id: &str,
    ) -> Result<Option<RequestRecord>, HotStoreError>;
    async fn set_api_key_mapping(
        &self,
        key_hash: &str,
        tenant_id: &str,
    ) -> Result<(), HotStoreError>;
    async fn get_api_key_mapping(&self, key_hash: &str) -> Result<Option<String>, HotStoreError>;

    /// Bulk-loads customer balances during bootstrap, initializing `reserved`
    /// to zero for each. Caller batches at 1000.
    async fn pipelined_bulk_set(&self, balances: &[(String, i64)]) -> Result<(), HotStoreError>;

    /// Overwrites a single customer's cached balance without touching
    /// `reserved`, used by periodic drift correction.
    async fn set_customer_balance(
        &self,
        customer_id: &str,
        balance_grains: i64,
    ) -> Result<(), HotStoreError>;

    async fn reserve(&self, cmd: ReserveCommand) -> Result<ReserveOutcome, HotStoreError>;
    async fn deduct(&self, cmd: DeductCommand) -> Result<DeductOutcome, HotStoreError>;
    async fn finalize(&self, cmd: FinalizeCommand) -> Result<FinalizeOutcome, HotStoreError>;
}

#[derive(Clone)]
pub struct RedisHotStore {
    connection: ConnectionManager,
    scripts: std::sync::Arc<ScriptSet>,
}

impl RedisHotStore {
    #[instrument(skip(password))]
    pub async fn connect(address: &str, password: Option<&str>) -> Result<Self, HotStoreError> {
        let client_url = match password {
            Some(pw) if !pw.is_empty() => redis_url_with_password(address, pw),
            _ => address.to_string(),
        };

        let client = redis::Client::open(client_url)
            .map_err(|e| HotStoreError::Connection(e.to_string()))?;

        let connection = tokio::time::timeout(CONNECT_TIMEOUT.max(Duration::from_secs(2)), client.get_connection_manager())
            .await
            .map_err(|_| HotStoreError::Timeout("connection manager handshake".into()))?
            .map_err(|e| HotStoreError::Connection(e.to_string()))?;

        debug!("hot store connection manager established");

        Ok(Self {
            connection,
            scripts: std::sync::Arc::new(ScriptSet::compile()),
        })
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, HotStoreError>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(OPERATION_TIMEOUT, fut)
            .await
            .map_err(|_| HotStoreError::Timeout("hot store round trip exceeded budget".into()))?
            .map_err(|e| HotStoreError::Connection(e.to_string()))
    }
}

fn redis_url_with_password(address: &str, password: &str) -> String {
    if let Some(rest) = address.strip_prefix("redis://") {
        format!("redis://:{password}@{rest}")
    } else {
        format!("redis://:{password}@{address}")
    }
}

#[async_trait]
impl HotStoreAdapter for RedisHotStore {
    async fn get_balance(&self, customer_id: &str) -> Result<i64, HotStoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = self
            .with_timeout(conn.get(balance_key(customer_id)))
            .await?;
        Ok(raw.and_then(|s| s.parse().ok()).unwrap_or(0))
    }

    async fn get_reserved(&self, customer_id: &str) -> Result<i64, HotStoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = self
            .with_timeout(conn.get(reserved_key(customer_id)))
            .await?;
        Ok(raw.and_then(|s| s.parse().ok()).unwrap_or(0))
    }

    async fn get_request_fields(
        &self,
        request_id: &str,
    ) -> Result<Option<RequestRecord>, HotStoreError> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> = self
            .with_timeout(conn.hgetall(request_key(request_id)))
            .await?;

        if fields.is_empty() {
            return Ok(None);
        }

        parse_request_record(request_id, &fields)
            .map(Some)
            .map_err(HotStoreError::Mapping)
    }

    async fn set_api_key_mapping(
        &self,
        key_hash: &str,
        tenant_id: &str,
    ) -> Result<(), HotStoreError> {
        let mut conn = self.connection.clone();
        self.with_timeout(conn.set(apikey_key(key_hash), tenant_id))
            .await
    }

    async fn get_api_key_mapping(&self, key_hash: &str) -> Result<Option<String>, HotStoreError> {
        let mut conn = self.connection.clone();
        self.with_timeout(conn.get(apikey_key(key_hash))).await
    }

    #[instrument(skip(self, balances))]
    async fn pipelined_bulk_set(&self, balances: &[(String, i64)]) -> Result<(), HotStoreError> {
        if balances.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for (customer_id, balance) in balances {
            pipe.set(balance_key(customer_id), balance.to_string());
            pipe.set_nx(reserved_key(customer_id), "0");
        }

        let mut conn = self.connection.clone();
        let result: Result<(), redis::RedisError> = pipe.query_async(&mut conn).await;
        result.map_err(|e| HotStoreError::Connection(e.to_string()))
    }

    async fn set_customer_balance(
        &self,
        customer_id: &str,
        balance_grains: i64,
    ) -> Result<(), HotStoreError> {
        let mut conn = self.connection.clone();
        self.with_timeout(conn.set(balance_key(customer_id), balance_grains.to_string()))
            .await
    }

    #[instrument(skip(self, cmd), fields(request_id = %cmd.request_id))]
    async fn reserve(&self, cmd: ReserveCommand) -> Result<ReserveOutcome, HotStoreError> {
        let mut conn = self.connection.clone();
        let invocation = self.scripts.reserve.prepare_invoke();
        let result: Vec<String> = self
            .with_timeout(
                invocation
                    .key(balance_key(&cmd.customer_id))
                    .key(reserved_key(&cmd.customer_id))
                    .key(request_key(&cmd.request_id))
                    .arg(cmd.reserved_grains)
                    .arg(cmd.estimated_grains)
                    .arg(cmd.now.to_rfc3339())
                    .arg(&cmd.customer_id)
                    .arg(&cmd.tenant_id)
                    .arg(&cmd.model)
                    .arg(&cmd.provider)
                    .arg(cmd.metadata.to_string())
                    .invoke_async(&mut conn),
            )
            .await
            .map_err(script_fault)?;

        decode_reserve_reply(&result)
    }

    #[instrument(skip(self, cmd), fields(request_id = %cmd.request_id))]
    async fn deduct(&self, cmd: DeductCommand) -> Result<DeductOutcome, HotStoreError> {
        let mut conn = self.connection.clone();
        let invocation = self.scripts.deduct.prepare_invoke();
        let result: Vec<String> = self
            .with_timeout(
                invocation
                    .key(balance_key(&cmd.customer_id))
                    .key(request_key(&cmd.request_id))
                    .arg(cmd.grains)
                    .arg(cmd.tokens_consumed)
                    .arg(cmd.now.to_rfc3339())
                    .invoke_async(&mut conn),
            )
            .await
            .map_err(script_fault)?;

        let outcome = decode_deduct_reply(&result)?;
        if outcome.is_kill_signal() {
            warn!(request_id = %cmd.request_id, code = %outcome.error_code, "kill switch triggered");
        }
        Ok(outcome)
    }

    #[instrument(skip(self, cmd), fields(request_id = %cmd.request_id))]
    async fn finalize(&self, cmd: FinalizeCommand) -> Result<FinalizeOutcome, HotStoreError> {
        let mut conn = self.connection.clone();
        let invocation = self.scripts.finalize.prepare_invoke();
        let result: Vec<String> = self
            .with_timeout(
                invocation
                    .key(balance_key(&cmd.customer_id))
                    .key(reserved_key(&cmd.customer_id))
                    .key(request_key(&cmd.request_id))
                    .arg(cmd.actual_cost_grains)
                    .arg(cmd.terminal_status.as_str())
                    .arg(cmd.now.to_rfc3339())
                    .invoke_async(&mut conn),
            )
            .await
            .map_err(script_fault)?;

        decode_finalize_reply(&result)
    }
}

fn script_fault(err: redis::RedisError) -> HotStoreError {
    error!(error = %err, "atomic script invocation failed");
    HotStoreError::Script(err.to_string())
}

fn decode_reserve_reply(reply: &[String]) -> Result<ReserveOutcome, HotStoreError> {
    let [approved, available, reason] = reply else {
        return Err(HotStoreError::Mapping("reserve: unexpected reply arity".into()));
    };
    Ok(ReserveOutcome {
        approved: approved == "1",
        remaining_available: available
            .parse()
            .map_err(|_| HotStoreError::Mapping("reserve: non-integer balance".into()))?,
        rejection_reason: reason.clone(),
    })
}

fn decode_deduct_reply(reply: &[String]) -> Result<DeductOutcome, HotStoreError> {
    let [success, balance, reason] = reply else {
        return Err(HotStoreError::Mapping("deduct: unexpected reply arity".into()));
    };
    Ok(DeductOutcome {
        success: success == "1",
        remaining_balance: balance
            .parse()
            .map_err(|_| HotStoreError::Mapping("deduct: non-integer balance".into()))?,
        error_code: reason.clone(),
    })
}

fn decode_finalize_reply(reply: &[String]) -> Result<FinalizeOutcome, HotStoreError> {
    let [success, refund, balance, reason] = reply else {
        return Err(HotStoreError::Mapping("finalize: unexpected reply arity".into()));
    };
    Ok(FinalizeOutcome {
        success: success == "1",
        refunded_grains: refund
            .parse()
            .map_err(|_| HotStoreError::Mapping("finalize: non-integer refund".into()))?,
        final_balance: balance
            .parse()
            .map_err(|_| HotStoreError::Mapping("finalize: non-integer balance".into()))?,
        error_code: reason.clone(),
    })
}

fn parse_request_record(
    request_id: &str,
    fields: &HashMap<String, String>,
) -> Result<RequestRecord, String> {
    let get = |key: &str| fields.get(key).cloned().unwrap_or_default();
    let get_i64 = |key: &str| -> i64 { fields.get(key).and_then(|v| v.parse().ok()).unwrap_or(0) };
    let parse_time = |key: &str| -> Option<DateTime<Utc>> {
        fields
            .get(key)
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };

    let status: RequestStatus = get("status")
        .parse()
        .map_err(|e: String| format!("request {request_id}: {e}"))?;

    Ok(RequestRecord {
        request_id: request_id.to_string(),
        customer_id: get("customer_id"),
        tenant_id: get("tenant_id"),
        model: get("model"),
        provider: get("provider"),
        estimated_grains: get_i64("estimated_grains"),
        reserved_grains: get_i64("reserved_grains"),
        consumed_grains: get_i64("consumed_grains"),
        status,
        actual_cost_grains: fields.get("actual_cost_grains").and_then(|v| v.parse().ok()),
        refunded_grains: fields.get("refunded_grains").and_then(|v| v.parse().ok()),
        reconciliation_delta_grains: None,
        prompt_tokens: None,
        completion_tokens: None,
        kill_reason: fields.get("kill_reason").cloned(),
        integrity_issue: fields.get("integrity_issue").cloned(),
        metadata: fields
            .get("metadata")
            .and_then(|v| serde_json::from_str(v).ok())
            .unwrap_or(serde_json::Value::Null),
        created_at: parse_time("created_at").unwrap_or_else(Utc::now),
        last_deduction_at: parse_time("last_deduction_at"),
        finalized_at: parse_time("finalized_at"),
    })
}
