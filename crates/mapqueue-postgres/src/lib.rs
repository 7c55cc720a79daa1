//! Postgres storage for the mapqueue search engine.
//!
//! [`PgSearchStore`] implements the engine's `SearchStore` port with sqlx.
//! [`SCHEMA`] is the reference schema the composed statements are written
//! against.

pub mod config;
pub mod store;

pub use config::{mask_database_url, DatabaseConfig};
pub use store::PgSearchStore;

/// Reference schema for the tables the search engine reads.
pub const SCHEMA: &str = include_str!("../migrations/0001_search_schema.sql");

/// Apply [`SCHEMA`]. Every statement is idempotent.
pub async fn apply_schema(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("search schema applied");
    Ok(())
}
