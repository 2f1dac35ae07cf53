//! Transactional CRUD over the catalog tables.
//!
//! Each write opens one transaction, re-reads the stored row, merges and validates the
//! payload, checks references and uniqueness, applies the change and any relationship
//! reconciliation or cascade, then commits. Responses are shaped after the commit.

mod genres;
mod movies;
mod people;
mod reviews;

use std::{collections::HashSet, sync::Arc};

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, TransactionTrait,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{AppResult, FieldErrors};

#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
    write_gate: Arc<Mutex<()>>,
}

/// Held for the lifetime of a write transaction.
type WriteGuard = OwnedMutexGuard<()>;

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, write_gate: Arc::new(Mutex::new(())) }
    }

    /// Opens a write transaction once every other writer has finished. SQLite fails a deferred
    /// transaction's lock upgrade with SQLITE_BUSY rather than waiting, so writers queue here.
    async fn begin_write(&self) -> AppResult<(WriteGuard, DatabaseTransaction)> {
        let guard = self.write_gate.clone().lock_owned().await;
        let txn = self.db.begin().await?;
        Ok((guard, txn))
    }
}

/// Ids from `ids` that exist in `column`'s table.
async fn existing_ids<E, C>(conn: &C, column: E::Column, ids: &[i32]) -> AppResult<HashSet<i32>>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(HashSet::new());
    }
    let found: Vec<i32> = E::find()
        .select_only()
        .column(column)
        .filter(column.is_in(ids.iter().copied()))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(found.into_iter().collect())
}

/// Records an error on `field` for every id in `ids` missing from `found`.
fn report_missing(errors: &mut FieldErrors, field: &str, ids: &[i32], found: &HashSet<i32>) {
    for id in ids.iter().filter(|id| !found.contains(id)) {
        errors.add(field, invalid_pk(*id));
    }
}

fn invalid_pk(id: i32) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Catalog;
    use crate::{config::Config, db};

    pub async fn catalog() -> Catalog {
        let config = Config::for_tests();
        let db = db::connect_and_migrate(&config.database_url, config.db_max_connections)
            .await
            .expect("in-memory database");
        Catalog::new(db)
    }
}
