// [apps/ledger-service/src/main.rs]
/*!
 * =================================================================
 * APARATO: LEDGER SERVICE MAIN ENTRY POINT (V1.0)
 * CLASIFICACION: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: IGNICION DEL RESERVATION LEDGER
 * =================================================================
 */

use dotenvy::dotenv;
use grainledger_service::bootstrap;
use grainledger_service::telemetry::init_tracing;
use tracing::error;

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_tracing("grainledger_service", &log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        if let Err(err) = bootstrap::run().await {
            error!(error = %err, "grain ledger terminated with a fault");
            return Err(err);
        }
        Ok(())
    })
}
