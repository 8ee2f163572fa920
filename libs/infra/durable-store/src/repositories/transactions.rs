// [libs/infra/durable-store/src/repositories/transactions.rs]
//! Ledger-entry writes to `transactions`. Unlike the other repositories in
//! this module, an entry never lands by itself -- it must commit in the
//! same database transaction as the request row and customer balance it
//! settles, so `append` takes the caller's open `libsql::Transaction`
//! rather than owning its own `Connection`.

use grainledger_models::Transaction;
use libsql::{params, Transaction as DbTransaction};

use crate::errors::DbError;

pub struct TransactionRepository;

impl TransactionRepository {
    pub async fn append(tx: &DbTransaction, transaction: &Transaction) -> Result<(), DbError> {
        tx.execute(
            "INSERT INTO transactions (transaction_id, customer_id, amount_grains, kind, external_reference, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                transaction.transaction_id.clone(),
                transaction.customer_id.clone(),
                transaction.amount_grains,
                transaction.kind.as_str(),
                transaction.external_reference.clone(),
                transaction.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }
}
