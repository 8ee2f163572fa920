// [libs/domain/ledger-models/src/transaction.rs]
//! Transaction: entrada de libro mayor, append-only, nunca mutada ni borrada.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    StripePayment,
    AiUsage,
    ReconciliationAdjustment,
    Refund,
    AdminAdjustment,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::StripePayment => "stripe_payment",
            TransactionKind::AiUsage => "ai_usage",
            TransactionKind::ReconciliationAdjustment => "reconciliation_adjustment",
            TransactionKind::Refund => "refund",
            TransactionKind::AdminAdjustment => "admin_adjustment",
        }
    }
}

/// Invariante: para todo cliente, `balance_grains` == suma de `amount_grains`
/// de sus transacciones (eventual -- el pipeline de escritura es asincrono;
/// la reconciliacion cierra la brecha).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub customer_id: String,
    /// Positivo = credito, negativo = debito.
    pub amount_grains: i64,
    pub kind: TransactionKind,
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}
