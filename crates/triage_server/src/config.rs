//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use triage_core::{ConditionsConfig, config};

use crate::error::ServerResult;

pub const DEFAULT_JWT_SECRET: &str = "your-super-secret-key-change-in-production";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (e.g., "127.0.0.1:8000")
    pub bind_address: String,

    /// JWT secret for signing tokens
    pub jwt_secret: String,

    /// Token expiration times
    pub access_token_ttl: u64, // seconds
    pub refresh_token_ttl: u64, // seconds

    /// CORS configuration
    pub cors: CorsConfig,

    /// NLM condition lookup
    pub conditions: ConditionsConfig,

    /// Admin account created at startup when its email is unused
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:8501".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_first_name")]
    pub first_name: String,
    #[serde(default = "default_admin_last_name")]
    pub last_name: String,
}

fn default_admin_first_name() -> String {
    "System".to_string()
}

fn default_admin_last_name() -> String {
    "Administrator".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            access_token_ttl: 30 * 60,           // 30 minutes
            refresh_token_ttl: 7 * 24 * 60 * 60, // 7 days
            cors: CorsConfig::default(),
            conditions: ConditionsConfig::default(),
            bootstrap_admin: None,
        }
    }
}

impl ServerConfig {
    /// Load from `path`, or from the standard locations, then apply the
    /// process environment on top
    pub async fn load(path: Option<&Path>) -> ServerResult<Self> {
        let (mut config, source): (Self, Option<PathBuf>) = match path {
            Some(path) => (config::load_config(path).await?, Some(path.to_path_buf())),
            None => config::load_from_standard_locations().await?,
        };

        match &source {
            Some(path) => tracing::info!(path = %path.display(), "loaded configuration"),
            None => tracing::info!("no configuration file found, using defaults"),
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;

        if config.jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("using the default JWT secret; set JWT_SECRET_KEY in production");
        }
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<()> {
        if let Some(addr) = lookup("TRIAGE_BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Some(secret) = lookup("JWT_SECRET_KEY") {
            self.jwt_secret = secret;
        }
        if let Some(minutes) = lookup("JWT_ACCESS_EXPIRE_MINUTES") {
            self.access_token_ttl = parse_seconds("JWT_ACCESS_EXPIRE_MINUTES", &minutes, 60)?;
        }
        if let Some(days) = lookup("JWT_REFRESH_EXPIRE_DAYS") {
            self.refresh_token_ttl = parse_seconds("JWT_REFRESH_EXPIRE_DAYS", &days, 24 * 60 * 60)?;
        }
        if let Some(origins) = lookup("TRIAGE_CORS_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(url) = lookup("NLM_API_BASE_URL") {
            self.conditions.base_url = url;
        }

        match (lookup("TRIAGE_ADMIN_EMAIL"), lookup("TRIAGE_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => {
                let (first_name, last_name) = self
                    .bootstrap_admin
                    .take()
                    .map(|admin| (admin.first_name, admin.last_name))
                    .unwrap_or_else(|| (default_admin_first_name(), default_admin_last_name()));
                self.bootstrap_admin = Some(BootstrapAdmin {
                    email,
                    password,
                    first_name,
                    last_name,
                });
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(config::invalid_value(
                    "environment",
                    "TRIAGE_ADMIN_EMAIL",
                    "TRIAGE_ADMIN_EMAIL and TRIAGE_ADMIN_PASSWORD set together",
                    "only one of the pair is set",
                )
                .into());
            }
            (None, None) => {}
        }

        Ok(())
    }
}

fn parse_positive(key: &str, value: &str) -> ServerResult<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(config::invalid_value("environment", key, "positive integer", value).into()),
    }
}

/// A positive count of `unit_seconds`-long units, in seconds
fn parse_seconds(key: &str, value: &str, unit_seconds: u64) -> ServerResult<u64> {
    parse_positive(key, value)?
        .checked_mul(unit_seconds)
        .filter(|seconds| i64::try_from(*seconds).is_ok())
        .ok_or_else(|| {
            config::invalid_value("environment", key, "a lifetime that fits in seconds", value)
                .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1:8000");
        assert_eq!(config.access_token_ttl, 1800);
        assert_eq!(config.refresh_token_ttl, 604800);
        assert_eq!(config.cors.allowed_origins, vec!["http://localhost:8501"]);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            bind_address = "0.0.0.0:9000"

            [conditions]
            max_results = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.conditions.max_results, 3);
        assert_eq!(config.conditions.base_url, "https://clinicaltables.nlm.nih.gov");
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config
            .apply_overrides(env(&[
                ("JWT_SECRET_KEY", "s3cret"),
                ("JWT_ACCESS_EXPIRE_MINUTES", "5"),
                ("JWT_REFRESH_EXPIRE_DAYS", "1"),
                ("TRIAGE_CORS_ORIGINS", "http://a.test, http://b.test,"),
                ("NLM_API_BASE_URL", "http://localhost:9999"),
            ]))
            .unwrap();

        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.access_token_ttl, 300);
        assert_eq!(config.refresh_token_ttl, 86400);
        assert_eq!(config.cors.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.conditions.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_overrides(env(&[("JWT_ACCESS_EXPIRE_MINUTES", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_oversized_lifetime_override_rejected() {
        let mut config = ServerConfig::default();
        for (key, value) in [
            ("JWT_ACCESS_EXPIRE_MINUTES", "18446744073709551615"),
            ("JWT_REFRESH_EXPIRE_DAYS", "300000000000000"),
        ] {
            let err = config.apply_overrides(env(&[(key, value)])).unwrap_err();
            assert!(err.to_string().contains("Configuration error"), "{err}");
        }
        assert_eq!(config.access_token_ttl, 1800);
        assert_eq!(config.refresh_token_ttl, 604800);
    }

    #[test]
    fn test_bootstrap_admin_from_env() {
        let mut config = ServerConfig::default();
        config
            .apply_overrides(env(&[
                ("TRIAGE_ADMIN_EMAIL", "root@example.com"),
                ("TRIAGE_ADMIN_PASSWORD", "change-me-now"),
            ]))
            .unwrap();
        let admin = config.bootstrap_admin.unwrap();
        assert_eq!(admin.email, "root@example.com");
        assert_eq!(admin.first_name, "System");

        let mut config = ServerConfig::default();
        assert!(
            config
                .apply_overrides(env(&[("TRIAGE_ADMIN_EMAIL", "root@example.com")]))
                .is_err()
        );
    }
}
