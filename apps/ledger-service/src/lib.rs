// [apps/ledger-service/src/lib.rs]
//! Composition root for the Reservation Ledger process.

pub mod bootstrap;
pub mod telemetry;
