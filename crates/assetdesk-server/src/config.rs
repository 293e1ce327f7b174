//! Server configuration loaded from the process environment

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Durable backend target. Absent means in-memory storage.
    #[serde(default)]
    pub database_url: Option<String>,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    #[serde(default)]
    pub admin_password: Option<String>,
    #[serde(default)]
    pub admin_email: Option<String>,
    pub heartbeat_interval_secs: u64,
    pub readiness_timeout_secs: u64,
    pub step_timeout_secs: u64,
    pub admin_check_delay_ms: u64,
}

impl ServerConfig {
    /// Read `DATABASE_URL`, `BIND_ADDRESS`, `DATA_DIR`, `JWT_SECRET`,
    /// `ADMIN_PASSWORD`, `ADMIN_EMAIL` and the timing knobs
    pub fn from_env() -> Result<Self> {
        let raw = config::Config::builder()
            .set_default("bind_address", "0.0.0.0:5000")?
            .set_default("data_dir", "./data")?
            .set_default("jwt_secret", "")?
            .set_default("heartbeat_interval_secs", 60)?
            .set_default("readiness_timeout_secs", 10)?
            .set_default("step_timeout_secs", 15)?
            .set_default("admin_check_delay_ms", 100)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("Failed to read environment")?;

        let mut cfg: ServerConfig = raw
            .try_deserialize()
            .context("Invalid server configuration")?;

        if cfg.jwt_secret.is_empty() {
            warn!("JWT_SECRET not set, generating an ephemeral secret (tokens will not survive restarts)");
            cfg.jwt_secret = random_secret(48);
        }
        cfg.database_url = cfg.database_url.filter(|u| !u.trim().is_empty());

        Ok(cfg)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs.max(1))
    }

    pub fn admin_check_delay(&self) -> Duration {
        Duration::from_millis(self.admin_check_delay_ms)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: std::env::temp_dir(),
            jwt_secret: "test-secret".to_string(),
            admin_password: Some("admin-pass".to_string()),
            admin_email: None,
            heartbeat_interval_secs: 60,
            readiness_timeout_secs: 1,
            step_timeout_secs: 5,
            admin_check_delay_ms: 0,
        }
    }
}

/// Alphanumeric secret of `len` characters
pub fn random_secret(len: usize) -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_secret_length() {
        let a = random_secret(24);
        assert_eq!(a.len(), 24);
        assert_ne!(a, random_secret(24));
    }

    #[test]
    fn test_durations_have_floors() {
        let mut cfg = ServerConfig::for_tests();
        cfg.heartbeat_interval_secs = 0;
        cfg.step_timeout_secs = 0;
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(1));
        assert_eq!(cfg.step_timeout(), Duration::from_secs(1));
    }
}
