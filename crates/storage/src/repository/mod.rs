pub mod event;
pub mod participant;

use sqlx::{PgPool, Postgres, Transaction};

use crate::error::Result;

pub(crate) const SNAPSHOT_READ: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

/// Read-only transaction whose statements all see one snapshot.
pub(crate) async fn snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await?;
    sqlx::query(SNAPSHOT_READ).execute(&mut *tx).await?;
    Ok(tx)
}
