pub mod dto;
pub mod error;
pub mod ingest;
pub mod models;
pub mod query;
pub mod repository;
pub mod store;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::error::Result;
use crate::store::PgStore;

/// Connection pool wrapper shared by the web server and tooling.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Results store backed by this pool.
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }
}
