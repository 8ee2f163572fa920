// [libs/infra/durable-store/src/repositories/requests.rs]
//! Request lifecycle writes.
//!
//! Two write paths, both off the hot path, executed by the async write
//! pipeline's worker pool:
//!   - `insert_preflight`: one row on reservation approval.
//!   - `finalize`: updates the request row AND appends one negative
//!     `ai_usage` transaction row, inside a single database transaction.

use chrono::{DateTime, Utc};
use grainledger_models::{RequestRecord, Transaction, TransactionKind};
use libsql::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::DbError;
use crate::repositories::transactions::TransactionRepository;

pub struct RequestRepository {
    connection: Connection,
}

/// Everything `finalize` needs to close out a request row and append its
/// settling transaction in one shot.
pub struct FinalizeWrite<'a> {
    pub request_id: &'a str,
    pub customer_id: &'a str,
    pub status: &'a str,
    pub actual_cost_grains: i64,
    pub refunded_grains: i64,
    pub reconciliation_delta_grains: i64,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub integrity_issue: Option<&'a str>,
    pub now: DateTime<Utc>,
}

impl RequestRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self, record))]
    pub async fn insert_preflight(&self, record: &RequestRecord) -> Result<(), DbError> {
        self.connection
            .execute(
                "INSERT INTO requests (\
                    request_id, customer_id, tenant_id, model, provider, \
                    estimated_grains, reserved_grains, consumed_grains, status, \
                    metadata_json, created_at\
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.request_id.clone(),
                    record.customer_id.clone(),
                    record.tenant_id.clone(),
                    record.model.clone(),
                    record.provider.clone(),
                    record.estimated_grains,
                    record.reserved_grains,
                    record.consumed_grains,
                    record.status.as_str(),
                    record.metadata.to_string(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, write))]
    pub async fn finalize(&self, write: FinalizeWrite<'_>) -> Result<(), DbError> {
        let tx = self
            .connection
            .transaction()
            .await
            .map_err(|_| DbError::Transaction)?;

        tx.execute(
            "UPDATE requests SET \
                status = ?1, actual_cost_grains = ?2, refunded_grains = ?3, \
                reconciliation_delta_grains = ?4, prompt_tokens = ?5, \
                completion_tokens = ?6, integrity_issue = ?7, finalized_at = ?8 \
             WHERE request_id = ?9",
            params![
                write.status,
                write.actual_cost_grains,
                write.refunded_grains,
                write.reconciliation_delta_grains,
                write.prompt_tokens.map(|v| v as i64),
                write.completion_tokens.map(|v| v as i64),
                write.integrity_issue,
                write.now.to_rfc3339(),
                write.request_id,
            ],
        )
        .await?;

        let settling_transaction = Transaction {
            transaction_id: Uuid::new_v4().to_string(),
            customer_id: write.customer_id.to_string(),
            amount_grains: -write.actual_cost_grains,
            kind: TransactionKind::AiUsage,
            external_reference: Some(write.request_id.to_string()),
            created_at: write.now,
        };
        TransactionRepository::append(&tx, &settling_transaction).await?;

        tx.execute(
            "UPDATE customers SET balance_grains = balance_grains - ?1, \
                lifetime_spent_grains = lifetime_spent_grains + ?1, updated_at = ?2 \
             WHERE customer_id = ?3",
            params![write.actual_cost_grains, write.now.to_rfc3339(), write.customer_id],
        )
        .await?;

        tx.commit().await.map_err(|_| DbError::Transaction)?;
        Ok(())
    }
}
