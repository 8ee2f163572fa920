// [libs/infra/durable-store/src/repositories/mod.rs]
pub mod api_keys;
pub mod customers;
pub mod integrity;
pub mod pricing;
pub mod requests;
pub mod transactions;

pub use api_keys::ApiKeyRepository;
pub use customers::CustomerRepository;
pub use integrity::{IntegrityReport, IntegrityRepository};
pub use pricing::PricingRepository;
pub use requests::{FinalizeWrite, RequestRepository};
pub use transactions::TransactionRepository;
