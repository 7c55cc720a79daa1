//! Service configuration from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use mapqueue_postgres::DatabaseConfig;
use mapqueue_search::model::regex_guard::DEFAULT_PROBE_TIMEOUT;
use mapqueue_search::service::DEFAULT_LIMIT;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4300";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub bind_addr: SocketAddr,
    /// Attach a score breakdown to every search.
    pub search_debug: bool,
    pub regex_timeout: Duration,
    pub default_limit: u32,
}

impl AppConfig {
    /// Read the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let mut database = DatabaseConfig::new(database_url);
        if let Some(size) = lookup("DATABASE_POOL_SIZE") {
            database.max_connections = parse("DATABASE_POOL_SIZE", &size)?;
        }

        let bind_addr = lookup("MAPQUEUE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = parse("MAPQUEUE_BIND_ADDR", &bind_addr)?;

        let search_debug = match lookup("MAPQUEUE_SEARCH_DEBUG") {
            Some(v) => parse_flag(&v).with_context(|| format!("MAPQUEUE_SEARCH_DEBUG: {v}"))?,
            None => false,
        };

        let regex_timeout = match lookup("MAPQUEUE_REGEX_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(parse("MAPQUEUE_REGEX_TIMEOUT_MS", &ms)?),
            None => DEFAULT_PROBE_TIMEOUT,
        };

        let default_limit = match lookup("MAPQUEUE_DEFAULT_LIMIT") {
            Some(v) => parse("MAPQUEUE_DEFAULT_LIMIT", &v)?,
            None => DEFAULT_LIMIT,
        };

        Ok(Self {
            database,
            bind_addr,
            search_debug,
            regex_timeout,
            default_limit,
        })
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {value}"))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[("DATABASE_URL", "postgres://db/mapqueue")]).unwrap();
        assert_eq!(c.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(!c.search_debug);
        assert_eq!(c.regex_timeout, DEFAULT_PROBE_TIMEOUT);
        assert_eq!(c.default_limit, DEFAULT_LIMIT);
        assert_eq!(c.database.max_connections, 10);
    }

    #[test]
    fn overrides() {
        let c = config(&[
            ("DATABASE_URL", "postgres://db/mapqueue"),
            ("DATABASE_POOL_SIZE", "4"),
            ("MAPQUEUE_BIND_ADDR", "127.0.0.1:9000"),
            ("MAPQUEUE_SEARCH_DEBUG", "yes"),
            ("MAPQUEUE_REGEX_TIMEOUT_MS", "250"),
            ("MAPQUEUE_DEFAULT_LIMIT", "20"),
        ])
        .unwrap();
        assert_eq!(c.database.max_connections, 4);
        assert_eq!(c.bind_addr.port(), 9000);
        assert!(c.search_debug);
        assert_eq!(c.regex_timeout, Duration::from_millis(250));
        assert_eq!(c.default_limit, 20);
    }

    #[test]
    fn missing_database_url_and_bad_values_fail() {
        assert!(config(&[]).is_err());
        assert!(config(&[("DATABASE_URL", "x"), ("DATABASE_POOL_SIZE", "many")]).is_err());
        assert!(config(&[("DATABASE_URL", "x"), ("MAPQUEUE_SEARCH_DEBUG", "maybe")]).is_err());
    }
}
