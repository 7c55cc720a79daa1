//! Connection pool configuration.

use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }

    /// `DATABASE_URL` (required) and `DATABASE_POOL_SIZE` (default 10).
    pub fn from_env() -> anyhow::Result<Self> {
        let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let mut config = Self::new(url);
        if let Ok(size) = std::env::var("DATABASE_POOL_SIZE") {
            config.max_connections = size
                .parse()
                .with_context(|| format!("DATABASE_POOL_SIZE is not a number: {size}"))?;
        }
        Ok(config)
    }

    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        info!(
            url = %mask_database_url(&self.database_url),
            max_connections = self.max_connections,
            "connecting to database"
        );

        let mut options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connection_timeout);
        if let Some(idle) = self.idle_timeout {
            options = options.idle_timeout(idle);
        }
        if let Some(lifetime) = self.max_lifetime {
            options = options.max_lifetime(lifetime);
        }

        let pool = options.connect(&self.database_url).await.map_err(|e| {
            warn!(error = %e, "failed to connect to database");
            e
        })?;
        info!("database pool ready");
        Ok(pool)
    }
}

/// Hide the password of a connection URL before it reaches a log line.
pub fn mask_database_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_password_only() {
        assert_eq!(
            mask_database_url("postgres://mapqueue:hunter2@db:5432/mapqueue"),
            "postgres://mapqueue:***@db:5432/mapqueue"
        );
        assert_eq!(
            mask_database_url("postgres://db/mapqueue"),
            "postgres://db/mapqueue"
        );
        assert_eq!(mask_database_url("not a url"), "***");
    }

    #[test]
    fn defaults() {
        let config = DatabaseConfig::new("postgres://db/mapqueue");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
    }
}
