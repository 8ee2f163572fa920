// [libs/infra/hot-store/src/lib.rs]
/*!
 * =================================================================
 * APARATO: HOT STORE (ATOMIC SCRIPT RUNTIME + TYPED ADAPTER)
 * CLASIFICACION: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 *
 * Tres scripts Lua atomicos (`reserve`, `deduct`, `finalize`) invocados
 * contra un almacen clave-valor compatible con Redis, mas los accesos
 * tipados que necesita el bootstrap y la sincronizacion de deriva.
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod keys;
pub mod scripts;
pub mod types;

pub use client::{HotStoreAdapter, RedisHotStore};
pub use errors::HotStoreError;
pub use types::{
    DeductCommand, DeductOutcome, FinalizeCommand, FinalizeOutcome, ReserveCommand,
    ReserveOutcome,
};
