// [libs/domain/ledger-models/src/pricing.rs]
//! ModelPricing: tarifa vigente por (model, provider), en granos por millon de tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    pub model: String,
    pub provider: String,
    pub input_per_million_grains: i64,
    pub output_per_million_grains: i64,
    pub effective_from: DateTime<Utc>,
    /// `None` denota la fila vigente. El core solo lee filas vigentes; el
    /// calculo de costo retroactivo queda fuera de alcance.
    pub effective_until: Option<DateTime<Utc>>,
}

impl ModelPricing {
    pub fn cache_key(model: &str, provider: &str) -> String {
        format!("{provider}:{model}")
    }
}
