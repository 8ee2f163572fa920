// [libs/infra/durable-store/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("[DURABLE_NET_FAULT]: connection lost or refused -> {0}")]
    Connection(String),

    #[error("[DURABLE_CONFIG_FAULT]: missing or malformed environment configuration -> {0}")]
    Configuration(String),

    #[error("[DURABLE_QUERY_FAULT]: {0}")]
    Query(#[from] libsql::Error),

    #[error("[DURABLE_MAPPING_FAULT]: {0}")]
    Mapping(String),

    #[error("[DURABLE_TX_FAULT]: multi-statement transaction did not commit")]
    Transaction,

    #[error("[DURABLE_NOT_FOUND]: {0}")]
    NotFound(String),
}

impl From<DbError> for grainledger_models::LedgerError {
    fn from(err: DbError) -> Self {
        grainledger_models::LedgerError::DurableStoreFault(err.to_string())
    }
}
