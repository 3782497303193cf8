//! Database Layer
//!
//! `PostgreSQL` connection handling, the store traits the services depend on,
//! and the two store backends (`PostgreSQL` and in-memory).

mod error;
pub mod memory;
mod models;
mod postgres;
mod queries;
mod store;

use std::time::Duration;

use anyhow::Result;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use models::*;
pub use postgres::PgStore;
pub use queries::*;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
pub use store::{AccountStore, ClassStore};
use tracing::info;

/// Create `PostgreSQL` connection pool with health configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(2)
        .max_connections(20)
        // Prevent hanging requests on pool exhaustion
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}
