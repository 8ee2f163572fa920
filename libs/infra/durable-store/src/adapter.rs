// [libs/infra/durable-store/src/adapter.rs]
//! `DurableStoreAdapter`: the seam the reservation ledger and the
//! reconciliation syncer program against, so both can be exercised in tests
//! against an in-memory fake instead of a live libSQL instance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grainledger_models::{Customer, ModelPricing, RequestRecord};

use crate::client::LedgerDbClient;
use crate::errors::DbError;
use crate::repositories::{
    ApiKeyRepository, CustomerRepository, IntegrityRepository, PricingRepository, RequestRepository,
};
pub use crate::repositories::{FinalizeWrite, IntegrityReport};

#[async_trait]
pub trait DurableStoreAdapter: Send + Sync {
    async fn insert_request_preflight(&self, record: &RequestRecord) -> Result<(), DbError>;
    async fn finalize_request(&self, write: FinalizeWrite<'_>) -> Result<(), DbError>;

    async fn full_customer_scan(&self) -> Result<Vec<Customer>, DbError>;
    async fn recently_updated_customers(&self, since: DateTime<Utc>) -> Result<Vec<Customer>, DbError>;
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, DbError>;
    async fn sample_customers(&self, n: usize) -> Result<Vec<Customer>, DbError>;

    async fn current_pricing(&self, model: &str, provider: &str) -> Result<Option<ModelPricing>, DbError>;
    async fn all_current_pricing(&self) -> Result<Vec<ModelPricing>, DbError>;

    async fn api_key_scan(&self) -> Result<Vec<(String, String)>, DbError>;

    async fn verify_balance_integrity(&self, customer_id: &str) -> Result<IntegrityReport, DbError>;
}

#[derive(Clone)]
pub struct LibsqlDurableStore {
    client: LedgerDbClient,
}

impl LibsqlDurableStore {
    pub fn new(client: LedgerDbClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DurableStoreAdapter for LibsqlDurableStore {
    async fn insert_request_preflight(&self, record: &RequestRecord) -> Result<(), DbError> {
        RequestRepository::new(self.client.connection()?)
            .insert_preflight(record)
            .await
    }

    async fn finalize_request(&self, write: FinalizeWrite<'_>) -> Result<(), DbError> {
        RequestRepository::new(self.client.connection()?)
            .finalize(write)
            .await
    }

    async fn full_customer_scan(&self) -> Result<Vec<Customer>, DbError> {
        CustomerRepository::new(self.client.connection()?)
            .full_scan()
            .await
    }

    async fn recently_updated_customers(&self, since: DateTime<Utc>) -> Result<Vec<Customer>, DbError> {
        CustomerRepository::new(self.client.connection()?)
            .recently_updated(since)
            .await
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, DbError> {
        CustomerRepository::new(self.client.connection()?)
            .get(customer_id)
            .await
    }

    async fn sample_customers(&self, n: usize) -> Result<Vec<Customer>, DbError> {
        CustomerRepository::new(self.client.connection()?).sample(n).await
    }

    async fn current_pricing(&self, model: &str, provider: &str) -> Result<Option<ModelPricing>, DbError> {
        PricingRepository::new(self.client.connection()?)
            .current(model, provider)
            .await
    }

    async fn all_current_pricing(&self) -> Result<Vec<ModelPricing>, DbError> {
        PricingRepository::new(self.client.connection()?)
            .all_current()
            .await
    }

    async fn api_key_scan(&self) -> Result<Vec<(String, String)>, DbError> {
        ApiKeyRepository::new(self.client.connection()?).scan().await
    }

    async fn verify_balance_integrity(&self, customer_id: &str) -> Result<IntegrityReport, DbError> {
        IntegrityRepository::new(self.client.connection()?)
            .verify(customer_id)
            .await
    }
}
