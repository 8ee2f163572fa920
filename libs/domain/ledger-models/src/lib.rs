// [libs/domain/ledger-models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: GRAIN LEDGER DOMAIN MODELS (V1.0)
 * CLASIFICACION: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: ENTIDADES COMPARTIDAS Y CATALOGO DE ERRORES
 *
 * Define el vocabulario comun entre el motor caliente (hot-store), el
 * motor durable (durable-store) y el orquestador (grainledger-core):
 * Customer, Transaction, RequestRecord, ModelPricing, y la taxonomia de
 * errores del ledger.
 * =================================================================
 */

pub mod customer;
pub mod errors;
pub mod pricing;
pub mod request;
pub mod transaction;

pub use customer::{BufferStrategy, Customer};
pub use errors::{IntegrityFlag, LedgerError, RejectionReason};
pub use pricing::ModelPricing;
pub use request::{RequestRecord, RequestStatus};
pub use transaction::{Transaction, TransactionKind};

/// Escala fija entre el grano (unidad atomica interna) y la moneda externa.
/// 1 000 000 granos = 1 unidad de moneda externa (seis digitos de precision).
pub const GRAINS_PER_UNIT: i64 = 1_000_000;

/// Aplica un multiplicador de buffer a un costo estimado, redondeando hacia
/// arriba. El redondeo es responsabilidad exclusiva del llamador; el core
/// nunca recalcula esto.
pub fn apply_buffer_ceiling(estimated_grains: i64, multiplier: f64) -> i64 {
    ((estimated_grains as f64) * multiplier).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_ceiling_rounds_up() {
        assert_eq!(apply_buffer_ceiling(50_000, 1.2), 60_000);
        assert_eq!(apply_buffer_ceiling(3, 1.2), 4);
        assert_eq!(apply_buffer_ceiling(0, 1.2), 0);
    }
}
