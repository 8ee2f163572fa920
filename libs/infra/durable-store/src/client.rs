// [libs/infra/durable-store/src/client.rs]
/*!
 * APARATO: DURABLE STORE CLIENT
 * CLASIFICACION: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GESTION DE ENLACES Y APLICACION DE ESQUEMA
 */

use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tracing::{debug, info, instrument};

use crate::errors::DbError;
use crate::schema::apply_schema;

#[derive(Clone)]
pub struct LedgerDbClient {
    database: Arc<Database>,
    /// Keeps an in-memory database alive across connections; SQLite purges
    /// an in-memory database once its last connection drops.
    _memory_anchor: Option<Arc<Connection>>,
}

impl LedgerDbClient {
    #[instrument(skip(access_token))]
    pub async fn connect(url: &str, access_token: Option<String>) -> Result<Self, DbError> {
        if url.is_empty() {
            return Err(DbError::Configuration("DATABASE_URL is not set".into()));
        }

        info!(url, "opening durable store connection");

        let is_remote = url.starts_with("libsql://") || url.starts_with("https://");
        let is_memory = url.contains(":memory:") || url.contains("mode=memory");

        let database = if is_remote {
            let token = access_token
                .ok_or_else(|| DbError::Configuration("remote durable store requires an access token".into()))?;
            Builder::new_remote(url.to_string(), token).build().await
        } else {
            Builder::new_local(url).build().await
        }
        .map_err(|e| DbError::Connection(e.to_string()))?;

        let database = Arc::new(database);
        let mut anchor = None;

        if is_memory {
            let anchor_conn = database
                .connect()
                .map_err(|e| DbError::Connection(e.to_string()))?;
            apply_schema(&anchor_conn).await?;
            anchor = Some(Arc::new(anchor_conn));
            debug!("in-memory durable store anchored for schema lifetime");
        } else {
            let bootstrap_conn = database
                .connect()
                .map_err(|e| DbError::Connection(e.to_string()))?;
            apply_schema(&bootstrap_conn).await?;
        }

        Ok(Self {
            database,
            _memory_anchor: anchor,
        })
    }

    pub fn connection(&self) -> Result<Connection, DbError> {
        self.database.connect().map_err(|e| DbError::Connection(e.to_string()))
    }
}
