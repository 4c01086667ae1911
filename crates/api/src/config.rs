//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use bitflow_observability::{LogConfig, LogFormat};

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres adapters when set, in-memory otherwise.
    pub database_url: Option<String>,
    pub dead_letter_path: PathBuf,
    pub max_body_bytes: usize,
    pub log: LogConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            database_url: None,
            dead_letter_path: PathBuf::from("./security-violations.deadletter.jsonl"),
            max_body_bytes: 1024 * 1024,
            log: LogConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn uses_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("BIND_ADDR") {
            config.bind_addr = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                message: format!("{e}"),
            })?;
        }

        if let Some(secret) = get("JWT_SECRET") {
            config.jwt_secret = secret;
        }

        config.database_url = get("DATABASE_URL");

        if let Some(path) = get("AUDIT_DEAD_LETTER_PATH") {
            config.dead_letter_path = PathBuf::from(path);
        }

        if let Some(raw) = get("MAX_BODY_BYTES") {
            config.max_body_bytes = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "MAX_BODY_BYTES",
                message: format!("{e}"),
            })?;
        }

        if let Some(raw) = get("LOG_FORMAT") {
            config.log.format = raw.parse::<LogFormat>().map_err(|e| ConfigError::Invalid {
                key: "LOG_FORMAT",
                message: e.to_string(),
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.uses_dev_jwt_secret());
        assert!(config.database_url.is_none());
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn reads_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/bitflow"),
            ("AUDIT_DEAD_LETTER_PATH", "/var/lib/bitflow/dl.jsonl"),
            ("MAX_BODY_BYTES", "2048"),
            ("LOG_FORMAT", "pretty"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/bitflow"));
        assert_eq!(config.dead_letter_path, PathBuf::from("/var/lib/bitflow/dl.jsonl"));
        assert_eq!(config.max_body_bytes, 2048);
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let config = ApiConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn rejects_malformed_values() {
        let err = ApiConfig::from_lookup(lookup(&[("MAX_BODY_BYTES", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MAX_BODY_BYTES"));
        assert!(ApiConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).is_err());
    }
}
