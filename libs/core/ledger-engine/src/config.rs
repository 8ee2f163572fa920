// [libs/core/ledger-engine/src/config.rs]
/*!
 * Environment-driven configuration. Every field has a documented default;
 * no secret is hard-coded.
 */

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GrainLedgerConfig {
    pub hot_store_address: String,
    pub hot_store_password: Option<String>,

    pub durable_store_url: String,
    pub durable_store_token: Option<String>,

    /// Bounded write-queue capacity for the async durable-write pipeline.
    pub write_queue_capacity: usize,
    /// Fixed-size worker pool draining the write queue.
    pub write_worker_count: usize,
    /// Base delay for exponential backoff on a failed durable write.
    pub retry_base: Duration,
    /// Maximum attempts before a durable write is abandoned.
    pub retry_max_attempts: u32,

    /// Periodic drift-correction interval, default 5 minutes.
    pub sync_interval: Duration,

    pub log_level: String,
    pub environment: String,
}

impl GrainLedgerConfig {
    /// Reads configuration from the process environment, falling back to
    /// documented defaults. Never panics on a missing variable.
    pub fn from_env() -> Self {
        Self {
            hot_store_address: env_or("HOT_STORE_ADDRESS", "redis://127.0.0.1:6379"),
            hot_store_password: std::env::var("HOT_STORE_PASSWORD").ok().filter(|v| !v.is_empty()),

            durable_store_url: env_or("DATABASE_URL", "file:grainledger.db"),
            durable_store_token: std::env::var("DATABASE_AUTH_TOKEN").ok().filter(|v| !v.is_empty()),

            write_queue_capacity: env_parsed("WRITE_QUEUE_CAPACITY", 10_000),
            write_worker_count: env_parsed("WRITE_WORKER_COUNT", 10),
            retry_base: Duration::from_millis(env_parsed("RETRY_BASE_MS", 100)),
            retry_max_attempts: env_parsed("RETRY_MAX_ATTEMPTS", 5),

            sync_interval: Duration::from_secs(env_parsed("SYNC_INTERVAL_SECONDS", 300)),

            log_level: env_or("LOG_LEVEL", "info"),
            environment: env_or("ENVIRONMENT", "development"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        std::env::remove_var("WRITE_QUEUE_CAPACITY");
        let config = GrainLedgerConfig::from_env();
        assert_eq!(config.write_queue_capacity, 10_000);
        assert_eq!(config.write_worker_count, 10);
        assert_eq!(config.retry_max_attempts, 5);
    }
}
