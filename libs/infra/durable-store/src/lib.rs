// [libs/infra/durable-store/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DURABLE STORE (RELATIONAL ADAPTER)
 * CLASIFICACION: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 *
 * Adaptador relacional sobre libSQL: lecturas de catalogo para el arranque
 * y la sincronizacion, escrituras del ciclo de vida de peticiones, y la
 * consulta de integridad de balance.
 * =================================================================
 */

pub mod adapter;
pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use adapter::{DurableStoreAdapter, LibsqlDurableStore};
pub use client::LedgerDbClient;
pub use errors::DbError;
pub use repositories::{FinalizeWrite, IntegrityReport, TransactionRepository};
