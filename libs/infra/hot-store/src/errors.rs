// [libs/infra/hot-store/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HotStoreError {
    #[error("[HOT_STORE_NET_FAULT]: connection lost or refused -> {0}")]
    Connection(String),

    #[error("[HOT_STORE_TIMEOUT]: round trip exceeded the operation budget -> {0}")]
    Timeout(String),

    #[error("[HOT_STORE_SCRIPT_FAULT]: script execution rejected -> {0}")]
    Script(String),

    #[error("[HOT_STORE_MAPPING_FAULT]: unexpected reply shape -> {0}")]
    Mapping(String),
}

impl From<HotStoreError> for grainledger_models::LedgerError {
    fn from(err: HotStoreError) -> Self {
        match err {
            HotStoreError::Script(detail) => grainledger_models::LedgerError::ScriptFault(detail),
            other => grainledger_models::LedgerError::HotStoreFault(other.to_string()),
        }
    }
}
