//! Configuration loading and representation.
//!
//! Every service is configured through environment variables:
//!
//! | variable | default | meaning |
//! |----------|---------|---------|
//! | `SERVICE_NAME` | per binary | name used in logs and consumer names |
//! | `BIND_ADDR` | per binary | HTTP listen address |
//! | `APP_ENV` | `development` | `development` enables the catalog seeder |
//! | `DATABASE_URL` | unset | Postgres URL; unset means in-memory stores |
//! | `SYNC_STRATEGY` | `events` | `events` (broker) or `direct` (HTTP call) |
//! | `REDIS_URL` | unset | Redis URL; unset means an in-process bus |
//! | `INVENTORY_BASE_URL` | `http://localhost:8081` | target of the `direct` strategy |
//! | `SYNC_RETRY_LIMIT` | `3` | retries after the first attempt |
//! | `SYNC_RETRY_INTERVAL_SECS` | `5` | pause between attempts |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use videopalace_events::RetryPolicy;

const DEFAULT_INVENTORY_BASE_URL: &str = "http://localhost:8081";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// How catalog writes reach the inventory service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Publish `CatalogItemAdded` to the broker.
    Events,
    /// Call the inventory service's direct-create endpoint.
    Direct,
}

impl FromStr for SyncStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "events" => Ok(Self::Events),
            "direct" => Ok(Self::Direct),
            other => Err(format!("unknown strategy `{other}` (expected `events` or `direct`)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub service_name: String,
    pub bind_addr: SocketAddr,
    pub app_env: String,
    pub database_url: Option<String>,
    pub sync_strategy: SyncStrategy,
    pub redis_url: Option<String>,
    pub inventory_base_url: String,
    pub retry: RetryPolicy,
}

impl ServiceConfig {
    /// Read the process environment.
    pub fn from_env(default_name: &str, default_bind: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(default_name, default_bind, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(
        default_name: &str,
        default_bind: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let service_name = get("SERVICE_NAME").unwrap_or_else(|| default_name.to_string());
        let bind_addr = parse("BIND_ADDR", get("BIND_ADDR").unwrap_or_else(|| default_bind.to_string()))?;
        let app_env = get("APP_ENV").unwrap_or_else(|| "development".to_string());
        let sync_strategy = parse("SYNC_STRATEGY", get("SYNC_STRATEGY").unwrap_or_else(|| "events".into()))?;
        let inventory_base_url =
            get("INVENTORY_BASE_URL").unwrap_or_else(|| DEFAULT_INVENTORY_BASE_URL.to_string());

        let defaults = RetryPolicy::default();
        let max_retries = match get("SYNC_RETRY_LIMIT") {
            Some(v) => parse("SYNC_RETRY_LIMIT", v)?,
            None => defaults.max_retries,
        };
        let interval = match get("SYNC_RETRY_INTERVAL_SECS") {
            Some(v) => Duration::from_secs(parse("SYNC_RETRY_INTERVAL_SECS", v)?),
            None => defaults.interval,
        };

        Ok(Self {
            service_name,
            bind_addr,
            app_env,
            database_url: get("DATABASE_URL"),
            sync_strategy,
            redis_url: get("REDIS_URL"),
            inventory_base_url,
            retry: RetryPolicy::fixed(max_retries, interval),
        })
    }

    /// Whether development-only behavior (seeding) is enabled.
    pub fn is_development(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("development")
    }
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServiceConfig::from_lookup("catalog", "0.0.0.0:8080", |k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_are_in_memory_events_and_development() {
        let cfg = config(&[]).unwrap();

        assert_eq!(cfg.service_name, "catalog");
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert!(cfg.is_development());
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.redis_url, None);
        assert_eq!(cfg.sync_strategy, SyncStrategy::Events);
        assert_eq!(cfg.inventory_base_url, "http://localhost:8081");
        assert_eq!(cfg.retry, RetryPolicy::fixed(3, Duration::from_secs(5)));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config(&[
            ("SERVICE_NAME", "catalog-2"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://localhost/videopalace"),
            ("SYNC_STRATEGY", "Direct"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("INVENTORY_BASE_URL", "http://inventory:8081"),
            ("SYNC_RETRY_LIMIT", "5"),
            ("SYNC_RETRY_INTERVAL_SECS", "1"),
        ])
        .unwrap();

        assert_eq!(cfg.service_name, "catalog-2");
        assert!(!cfg.is_development());
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/videopalace"));
        assert_eq!(cfg.sync_strategy, SyncStrategy::Direct);
        assert_eq!(cfg.retry, RetryPolicy::fixed(5, Duration::from_secs(1)));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("DATABASE_URL", "  "), ("SYNC_STRATEGY", "")]).unwrap();
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.sync_strategy, SyncStrategy::Events);
    }

    #[test]
    fn invalid_values_are_reported_by_name() {
        let err = config(&[("SYNC_STRATEGY", "carrier-pigeon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SYNC_STRATEGY", .. }));

        let err = config(&[("SYNC_RETRY_LIMIT", "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SYNC_RETRY_LIMIT", .. }));

        let err = config(&[("BIND_ADDR", "nowhere")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BIND_ADDR", .. }));
    }
}
