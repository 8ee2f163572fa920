// [libs/infra/durable-store/src/repositories/integrity.rs]
//! `verify_balance_integrity(customer_id)`: compares the authoritative
//! balance against the sum of that customer's ledger transactions.
//! libSQL has no stored-procedure facility, so this is one parameterized
//! query rather than a server-side function -- functionally identical.

use libsql::{params, Connection};

use crate::errors::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityReport {
    pub authoritative_balance_grains: i64,
    pub transaction_sum_grains: i64,
    pub delta_grains: i64,
    pub ok: bool,
}

pub struct IntegrityRepository {
    connection: Connection,
}

impl IntegrityRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub async fn verify(&self, customer_id: &str) -> Result<IntegrityReport, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT c.balance_grains, COALESCE(SUM(t.amount_grains), 0) AS tx_sum \
                 FROM customers c \
                 LEFT JOIN transactions t ON t.customer_id = c.customer_id \
                 WHERE c.customer_id = ?1 \
                 GROUP BY c.customer_id, c.balance_grains",
                params![customer_id],
            )
            .await?;

        let row = rows
            .next()
            .await?
            .ok_or_else(|| DbError::NotFound(format!("customer {customer_id}")))?;

        let balance: i64 = row.get(0)?;
        let tx_sum: i64 = row.get(1)?;
        let delta = balance - tx_sum;

        Ok(IntegrityReport {
            authoritative_balance_grains: balance,
            transaction_sum_grains: tx_sum,
            delta_grains: delta,
            ok: delta == 0,
        })
    }
}
