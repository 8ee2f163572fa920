// [libs/infra/durable-store/src/schema.rs]
/*!
 * Schema: `customers`, `transactions`, `requests`, `model_pricing`, plus
 * `tenants` / `platform_users` for multi-tenant API key routing. Applied
 * idempotently with `CREATE TABLE IF NOT EXISTS`.
 */

use libsql::Connection;
use tracing::{debug, info, instrument};

use crate::errors::DbError;

const TABLES: &[(&str, &str)] = &[
    ("tenants", r#"
        CREATE TABLE IF NOT EXISTS tenants (
            tenant_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("platform_users", r#"
        CREATE TABLE IF NOT EXISTS platform_users (
            user_id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(tenant_id),
            api_key_hash TEXT NOT NULL UNIQUE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("customers", r#"
        CREATE TABLE IF NOT EXISTS customers (
            customer_id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(tenant_id),
            balance_grains INTEGER NOT NULL DEFAULT 0 CHECK (balance_grains >= 0),
            lifetime_spent_grains INTEGER NOT NULL DEFAULT 0,
            default_buffer_strategy TEXT NOT NULL DEFAULT 'conservative',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("transactions", r#"
        CREATE TABLE IF NOT EXISTS transactions (
            transaction_id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL REFERENCES customers(customer_id),
            amount_grains INTEGER NOT NULL,
            kind TEXT NOT NULL,
            external_reference TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("requests", r#"
        CREATE TABLE IF NOT EXISTS requests (
            request_id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL REFERENCES customers(customer_id),
            tenant_id TEXT NOT NULL,
            model TEXT NOT NULL,
            provider TEXT NOT NULL,
            estimated_grains INTEGER NOT NULL,
            reserved_grains INTEGER NOT NULL,
            consumed_grains INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            actual_cost_grains INTEGER,
            refunded_grains INTEGER,
            reconciliation_delta_grains INTEGER,
            prompt_tokens INTEGER,
            completion_tokens INTEGER,
            kill_reason TEXT,
            integrity_issue TEXT,
            metadata_json TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            last_deduction_at DATETIME,
            finalized_at DATETIME
        );
    "#),
    ("model_pricing", r#"
        CREATE TABLE IF NOT EXISTS model_pricing (
            model_name TEXT NOT NULL,
            provider TEXT NOT NULL,
            effective_from DATETIME NOT NULL,
            effective_until DATETIME,
            input_per_million_grains INTEGER NOT NULL,
            output_per_million_grains INTEGER NOT NULL,
            PRIMARY KEY (model_name, provider, effective_from)
        );
    "#),
];

const INDEXES: &[(&str, &str)] = &[
    ("idx_customers_updated_at", "CREATE INDEX IF NOT EXISTS idx_customers_updated_at ON customers(updated_at);"),
    ("idx_transactions_customer", "CREATE INDEX IF NOT EXISTS idx_transactions_customer ON transactions(customer_id);"),
    ("idx_requests_customer", "CREATE INDEX IF NOT EXISTS idx_requests_customer ON requests(customer_id);"),
    ("idx_model_pricing_current", "CREATE INDEX IF NOT EXISTS idx_model_pricing_current ON model_pricing(model_name, provider) WHERE effective_until IS NULL;"),
];

#[instrument(skip(connection))]
pub async fn apply_schema(connection: &Connection) -> Result<(), DbError> {
    info!("applying durable store schema");

    for (name, sql) in TABLES {
        debug!(table = name, "ensuring table");
        connection.execute(sql, ()).await?;
    }

    for (name, sql) in INDEXES {
        debug!(index = name, "ensuring index");
        connection.execute(sql, ()).await?;
    }

    Ok(())
}
