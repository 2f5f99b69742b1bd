//! Database pool for the maintenance endpoint.
//!
//! The schema belongs to the hosted platform, so no migrations run here.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Initialize the PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(database_url)
        .await
}
