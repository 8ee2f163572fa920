// [apps/ledger-service/src/telemetry.rs]
//! Structured logging init. Dual mode: human-readable in debug builds,
//! flat JSON in release.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(service_name: &str, log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{service_name}={log_level},tower_http=warn,hyper=warn,libsql=error").into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if cfg!(debug_assertions) {
        registry.with(fmt::layer().with_target(true)).init();
    } else {
        registry.with(fmt::layer().json().flatten_event(true)).init();
    }
}
