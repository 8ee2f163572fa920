// [libs/infra/durable-store/src/repositories/customers.rs]
//! Catalog reads over `customers`.

use chrono::{DateTime, Utc};
use grainledger_models::{BufferStrategy, Customer};
use libsql::{params, Connection};
use std::str::FromStr;
use tracing::instrument;

use crate::errors::DbError;

pub struct CustomerRepository {
    connection: Connection,
}

impl CustomerRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Full scan used by `InitializeHotStore` at startup.
    #[instrument(skip(self))]
    pub async fn full_scan(&self) -> Result<Vec<Customer>, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT customer_id, tenant_id, balance_grains, lifetime_spent_grains, \
                 default_buffer_strategy, created_at, updated_at FROM customers",
                (),
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(map_row(&row)?);
        }
        Ok(out)
    }

    /// Incremental scan used by periodic drift correction.
    pub async fn recently_updated(&self, since: DateTime<Utc>) -> Result<Vec<Customer>, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT customer_id, tenant_id, balance_grains, lifetime_spent_grains, \
                 default_buffer_strategy, created_at, updated_at FROM customers \
                 WHERE updated_at > ?1",
                params![since.to_rfc3339()],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(map_row(&row)?);
        }
        Ok(out)
    }

    /// On-demand per-customer fetch, used for targeted repair (`SyncCustomer`).
    pub async fn get(&self, customer_id: &str) -> Result<Option<Customer>, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT customer_id, tenant_id, balance_grains, lifetime_spent_grains, \
                 default_buffer_strategy, created_at, updated_at FROM customers \
                 WHERE customer_id = ?1",
                params![customer_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Uniform sample of N customers for the on-demand integrity check.
    pub async fn sample(&self, n: usize) -> Result<Vec<Customer>, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT customer_id, tenant_id, balance_grains, lifetime_spent_grains, \
                 default_buffer_strategy, created_at, updated_at FROM customers \
                 ORDER BY RANDOM() LIMIT ?1",
                params![n as i64],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(map_row(&row)?);
        }
        Ok(out)
    }
}

fn map_row(row: &libsql::Row) -> Result<Customer, DbError> {
    let created_raw: String = row.get(5)?;
    let updated_raw: String = row.get(6)?;
    let buffer_raw: String = row.get(4)?;

    Ok(Customer {
        customer_id: row.get(0)?,
        tenant_id: row.get(1)?,
        balance_grains: row.get(2)?,
        lifetime_spent_grains: row.get(3)?,
        default_buffer_strategy: BufferStrategy::from_str(&buffer_raw)
            .map_err(DbError::Mapping)?,
        created_at: parse_timestamp(&created_raw)?,
        updated_at: parse_timestamp(&updated_raw)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Mapping(format!("bad timestamp '{raw}': {e}")))
}
