//! # Database Persistence Layer
//!
//! Postgres persistence for users via SQLx.
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, users are
//! stored in PostgreSQL through [`PgUserStore`]. When absent, the API runs
//! against the in-memory store (suitable for development and testing).

pub mod users;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub use users::PgUserStore;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no database URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set; running in-memory only mode. \
             Users will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
