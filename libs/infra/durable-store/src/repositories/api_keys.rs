// [libs/infra/durable-store/src/repositories/api_keys.rs]
//! `platform_users` scan, used to warm the hot store's `apikey:{hash}` map
//! during bootstrap.

use libsql::Connection;

use crate::errors::DbError;

pub struct ApiKeyRepository {
    connection: Connection,
}

impl ApiKeyRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Returns `(api_key_hash, tenant_id)` pairs for every registered user.
    pub async fn scan(&self) -> Result<Vec<(String, String)>, DbError> {
        let mut rows = self
            .connection
            .query("SELECT api_key_hash, tenant_id FROM platform_users", ())
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push((row.get(0)?, row.get(1)?));
        }
        Ok(out)
    }
}
