// [libs/domain/ledger-models/src/customer.rs]
//! Customer: identidad facturable, balance autoritativo y estrategia de buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Multiplicador aplicado por el llamador al costo estimado antes de
/// invocar `CheckAndReserve`. El core nunca recalcula esto.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BufferStrategy {
    /// 1.2x el costo estimado.
    Conservative,
    /// 1.0x el costo estimado (sin margen).
    Aggressive,
}

impl BufferStrategy {
    pub fn multiplier(self) -> f64 {
        match self {
            BufferStrategy::Conservative => 1.2,
            BufferStrategy::Aggressive => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BufferStrategy::Conservative => "conservative",
            BufferStrategy::Aggressive => "aggressive",
        }
    }
}

impl std::str::FromStr for BufferStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "conservative" => Ok(BufferStrategy::Conservative),
            "aggressive" => Ok(BufferStrategy::Aggressive),
            other => Err(format!("unknown buffer strategy: {other}")),
        }
    }
}

/// Entidad de cliente final. Creada por el flujo administrativo (fuera del
/// core), mutada solo por transacciones finalizadas, nunca destruida.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub tenant_id: String,
    pub balance_grains: i64,
    pub lifetime_spent_grains: i64,
    pub default_buffer_strategy: BufferStrategy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
