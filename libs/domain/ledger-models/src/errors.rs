// [libs/domain/ledger-models/src/errors.rs]
/*!
 * Catalogo de errores del Reservation Ledger.
 *
 * Tres familias semanticamente distintas, a proposito no unificadas en un
 * solo enum de "error":
 *  - `RejectionReason`  -- dato de respuesta, nunca un error de Rust.
 *  - `IntegrityFlag`    -- marca defensiva persistida en el request record.
 *  - `LedgerError`      -- fallo real (transitorio, permanente o de programador).
 */

use thiserror::Error;

/// Rechazo esperado: no es un fallo, es el resultado normal de una
/// verificacion de negocio. Se devuelve en el payload, nunca como panico
/// ni como variante de `LedgerError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    InsufficientBalance,
    RequestExists,
    RequestNotFound,
    BalanceNegative,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::InsufficientBalance => "INSUFFICIENT_BALANCE",
            RejectionReason::RequestExists => "REQUEST_EXISTS",
            RejectionReason::RequestNotFound => "REQUEST_NOT_FOUND",
            RejectionReason::BalanceNegative => "BALANCE_NEGATIVE",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deberia ser inalcanzable bajo operacion normal. Persistida en el request
/// record y registrada; la operacion completa de forma defensiva de todos
/// modos (balance en cero, reserva liberada).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityFlag {
    UnderchargeShortfall,
    ReservationUnderflow,
}

impl IntegrityFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            IntegrityFlag::UnderchargeShortfall => "undercharge_shortfall",
            IntegrityFlag::ReservationUnderflow => "reservation_underflow",
        }
    }
}

/// Fallo real propagado con `?`. El mapeo a codigos RPC (unauthenticated,
/// invalid_argument, internal, permission_denied) es responsabilidad del
/// colaborador de transporte, fuera de alcance de este crate.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Argumento invalido detectado antes de tocar cualquier estado
    /// (customer id vacio, monto de granos no positivo).
    #[error("[INVALID_ARGUMENT]: {0}")]
    InvalidArgument(String),

    /// Timeout o conexion rechazada contra el hot-store. Transitorio y
    /// reintentable; el llamador no debe asumir que el efecto ocurrio.
    #[error("[HOT_STORE_FAULT]: {0}")]
    HotStoreFault(String),

    /// Fallo al ejecutar uno de los tres scripts atomicos.
    #[error("[SCRIPT_FAULT]: {0}")]
    ScriptFault(String),

    /// Fallo de escritura contra el almacen durable tras agotar reintentos.
    /// Permanente para esta invocacion; el syncer repara la deriva.
    #[error("[DURABLE_STORE_FAULT]: {0}")]
    DurableStoreFault(String),

    /// La operacion fue cancelada antes de despachar el script. No tiene
    /// efecto sobre balances.
    #[error("[CANCELLED]: operation cancelled before dispatch")]
    Cancelled,

    /// Pricing no encontrado tras fallback a la lectura durable. Error duro,
    /// no una ausencia silenciosa.
    #[error("[PRICING_NOT_FOUND]: no current rate for {model} on {provider}")]
    PricingNotFound { model: String, provider: String },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
