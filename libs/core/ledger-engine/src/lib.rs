// [libs/core/ledger-engine/src/lib.rs]
/*!
 * =================================================================
 * APARATO: GRAIN LEDGER CORE (V1.0)
 * CLASIFICACION: DOMAIN ORCHESTRATOR (ESTRATO L2)
 *
 * Contrato publico del Reservation Ledger, el pipeline de escritura
 * asincrono y el cache de precios. Un unico round-trip al hot store por
 * metodo; las escrituras durables nunca estan en el camino caliente.
 * =================================================================
 */

pub mod config;
pub mod ledger;
pub mod pricing_cache;
pub mod write_pipeline;

/// In-process fakes for the hot-store and durable-store adapters. Public
/// (not `#[cfg(test)]`-gated) so integration tests under `tests/` and the
/// reconciliation crate's tests can drive the ledger without live infra.
pub mod test_support;

pub use config::GrainLedgerConfig;
pub use ledger::{
    BalanceView, DeductionOutcome, FinalizationOutcome, FinalizeRequest, ReservationLedger,
    ReservationOutcome,
};
pub use pricing_cache::PricingCache;
pub use write_pipeline::{FinalizationWrite, WriteOp, WritePipeline};
