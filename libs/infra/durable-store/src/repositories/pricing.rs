// [libs/infra/durable-store/src/repositories/pricing.rs]
//! Pricing table reads. Only current rows (`effective_until IS NULL`) are
//! read; back-dated cost calculation against historical pricing is out of
//! scope.

use grainledger_models::ModelPricing;
use libsql::{params, Connection};

use crate::errors::DbError;

pub struct PricingRepository {
    connection: Connection,
}

impl PricingRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub async fn current(
        &self,
        model: &str,
        provider: &str,
    ) -> Result<Option<ModelPricing>, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT model_name, provider, input_per_million_grains, \
                 output_per_million_grains, effective_from FROM model_pricing \
                 WHERE model_name = ?1 AND provider = ?2 AND effective_until IS NULL",
                params![model, provider],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Warms the pricing cache at startup.
    pub async fn all_current(&self) -> Result<Vec<ModelPricing>, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT model_name, provider, input_per_million_grains, \
                 output_per_million_grains, effective_from FROM model_pricing \
                 WHERE effective_until IS NULL",
                (),
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(map_row(&row)?);
        }
        Ok(out)
    }
}

fn map_row(row: &libsql::Row) -> Result<ModelPricing, DbError> {
    let effective_from_raw: String = row.get(4)?;
    Ok(ModelPricing {
        model: row.get(0)?,
        provider: row.get(1)?,
        input_per_million_grains: row.get(2)?,
        output_per_million_grains: row.get(3)?,
        effective_from: chrono::DateTime::parse_from_rfc3339(&effective_from_raw)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| DbError::Mapping(e.to_string()))?,
        effective_until: None,
    })
}
