//! Portal configuration.
//!
//! Environment variables are the primary source; an optional YAML file named
//! by `PORTAL_CONFIG` overrides individual fields. A missing session secret
//! falls back to a development default that `main` warns about loudly.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

pub const DEFAULT_CHANGES_LIMIT: u64 = 256;
pub const DEFAULT_CHANGE_RETENTION_MAX_ROWS: i64 = 4096;
pub const DEV_SESSION_SECRET: &str = "portal-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub session_secret: String,
    pub session_ttl_secs: u64,
    pub changes_limit: u64,
    pub change_retention_max_rows: Option<i64>,
    pub bootstrap_steward: Option<BootstrapSteward>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

/// Seed account created at startup so a fresh deployment has one steward to
/// approve everyone else. Creation is idempotent; an existing email wins.
#[derive(Debug, Clone)]
pub struct BootstrapSteward {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
struct PortalConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<String>,
    postgres_url: Option<String>,
    session_secret: Option<String>,
    session_ttl_secs: Option<u64>,
    changes_limit: Option<u64>,
    change_retention_max_rows: Option<i64>,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("PORTAL_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse PORTAL_BIND")?;
        let metrics_bind = std::env::var("PORTAL_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9102".to_string())
            .parse()
            .with_context(|| "parse PORTAL_METRICS_BIND")?;
        let storage = parse_storage(
            &std::env::var("PORTAL_STORAGE").unwrap_or_else(|_| "memory".to_string()),
        )?;
        let postgres = std::env::var("PORTAL_PG_URL").ok().map(|url| PostgresConfig {
            url,
            max_connections: env_u64("PORTAL_PG_MAX_CONNECTIONS", 8) as u32,
            acquire_timeout_ms: env_u64("PORTAL_PG_ACQUIRE_TIMEOUT_MS", 3000),
        });
        let session_secret = std::env::var("PORTAL_SESSION_SECRET")
            .unwrap_or_else(|_| DEV_SESSION_SECRET.to_string());
        let session_ttl_secs = env_u64("PORTAL_SESSION_TTL_SECS", 86_400);
        let changes_limit = env_u64("PORTAL_CHANGES_LIMIT", DEFAULT_CHANGES_LIMIT);
        let change_retention_max_rows = Some(env_i64(
            "PORTAL_CHANGE_RETENTION_MAX_ROWS",
            DEFAULT_CHANGE_RETENTION_MAX_ROWS,
        ));
        let bootstrap_steward = match (
            std::env::var("PORTAL_STEWARD_EMAIL").ok(),
            std::env::var("PORTAL_STEWARD_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(BootstrapSteward {
                email,
                password,
                full_name: std::env::var("PORTAL_STEWARD_NAME")
                    .unwrap_or_else(|_| "Hostel Steward".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            session_secret,
            session_ttl_secs,
            changes_limit,
            change_retention_max_rows,
            bootstrap_steward,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("PORTAL_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read PORTAL_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: PortalConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse portal config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = parse_storage(&value)?;
        }
        if let Some(url) = override_cfg.postgres_url {
            let existing = self.postgres.take();
            self.postgres = Some(PostgresConfig {
                url,
                max_connections: existing.as_ref().map(|pg| pg.max_connections).unwrap_or(8),
                acquire_timeout_ms: existing
                    .map(|pg| pg.acquire_timeout_ms)
                    .unwrap_or(3000),
            });
        }
        if let Some(value) = override_cfg.session_secret {
            self.session_secret = value;
        }
        if let Some(value) = override_cfg.session_ttl_secs {
            self.session_ttl_secs = value;
        }
        if let Some(value) = override_cfg.changes_limit {
            self.changes_limit = value;
        }
        if let Some(value) = override_cfg.change_retention_max_rows {
            self.change_retention_max_rows = Some(value);
        }
        Ok(())
    }
}

fn parse_storage(raw: &str) -> Result<StorageBackend> {
    match raw {
        "memory" => Ok(StorageBackend::Memory),
        "postgres" => Ok(StorageBackend::Postgres),
        other => anyhow::bail!("unknown storage backend: {other}"),
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> PortalConfig {
        PortalConfig {
            bind_addr: "127.0.0.1:8080".parse().expect("bind"),
            metrics_bind: "127.0.0.1:9102".parse().expect("metrics"),
            storage: StorageBackend::Memory,
            postgres: None,
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_ttl_secs: 86_400,
            changes_limit: DEFAULT_CHANGES_LIMIT,
            change_retention_max_rows: Some(DEFAULT_CHANGE_RETENTION_MAX_ROWS),
            bootstrap_steward: None,
        }
    }

    #[test]
    fn yaml_override_replaces_named_fields() {
        let mut config = base_config();
        config
            .apply_yaml(
                "bind_addr: \"127.0.0.1:9999\"\n\
                 storage: postgres\n\
                 postgres_url: \"postgres://localhost/portal\"\n\
                 session_ttl_secs: 120\n",
            )
            .expect("apply");
        assert_eq!(config.bind_addr.port(), 9999);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(
            config.postgres.as_ref().map(|pg| pg.url.as_str()),
            Some("postgres://localhost/portal")
        );
        assert_eq!(config.session_ttl_secs, 120);
        // Untouched fields keep their values.
        assert_eq!(config.changes_limit, DEFAULT_CHANGES_LIMIT);
    }

    #[test]
    fn yaml_override_rejects_unknown_storage() {
        let mut config = base_config();
        assert!(config.apply_yaml("storage: flatfile\n").is_err());
    }

    #[test]
    fn empty_yaml_changes_nothing() {
        let mut config = base_config();
        config.apply_yaml("{}\n").expect("apply");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.postgres.is_none());
    }
}
