//! Server monitoring types shared by the proxy and the dashboard client

use crate::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lower bound of the auto-refresh interval, in seconds
pub const MIN_REFRESH_INTERVAL: u64 = 30;
/// Upper bound of the auto-refresh interval, in seconds
pub const MAX_REFRESH_INTERVAL: u64 = 600;

/// Connection settings for a Zabbix monitoring server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub auto_refresh: bool,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
}

fn default_api_version() -> String {
    "6.0".to_string()
}

fn default_refresh_interval() -> u64 {
    60
}

impl MonitoringConfig {
    /// Checked before any request is sent
    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::new("url", "Zabbix URL is required"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ValidationError::new(
                "url",
                "URL must start with http:// or https://",
            ));
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::new("username", "username is required"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::new("password", "password is required"));
        }
        if !(MIN_REFRESH_INTERVAL..=MAX_REFRESH_INTERVAL).contains(&self.refresh_interval) {
            return Err(ValidationError::new(
                "refreshInterval",
                format!(
                    "refresh interval must be between {} and {} seconds",
                    MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL
                ),
            ));
        }
        Ok(())
    }

    /// Parsed `major.minor` of the configured API version
    pub fn api_version_tuple(&self) -> (u32, u32) {
        let mut parts = self.api_version.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        (major, minor)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }
}

/// Retry policy for metrics polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Authentication failures are never retried
    pub fn is_auth_failure(message: &str) -> bool {
        message.contains("Authentication") || message.contains("401")
    }

    /// Whether a request that has failed `failures` times should be tried again
    pub fn should_retry(&self, failures: u32, message: &str) -> bool {
        !Self::is_auth_failure(message) && failures <= self.max_retries
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .map(|d| d.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }
}

/// Host availability as reported by Zabbix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Up,
    Down,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMetrics {
    pub hostid: String,
    pub name: String,
    pub status: HostStatus,
    /// Monitoring enabled on the Zabbix side
    pub enabled: bool,
    pub cpu_utilization: Option<f64>,
    pub memory_utilization: Option<f64>,
    pub uptime_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub eventid: String,
    pub name: String,
    /// 0 (not classified) to 5 (disaster)
    pub severity: u8,
    pub host: Option<String>,
    pub clock: DateTime<Utc>,
    pub acknowledged: bool,
}

impl Problem {
    pub fn severity_label(&self) -> &'static str {
        severity_label(self.severity)
    }
}

pub fn severity_label(severity: u8) -> &'static str {
    match severity {
        0 => "not classified",
        1 => "information",
        2 => "warning",
        3 => "average",
        4 => "high",
        _ => "disaster",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub hosts: Vec<HostMetrics>,
    pub problems: Vec<Problem>,
    pub fetched_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    pub fn hosts_up(&self) -> usize {
        self.hosts.iter().filter(|h| h.status == HostStatus::Up).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResult {
    pub success: bool,
    pub version: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(interval: u64) -> MonitoringConfig {
        MonitoringConfig {
            url: "https://zabbix.example.com".to_string(),
            username: "Admin".to_string(),
            password: "zabbix".to_string(),
            api_version: "6.0".to_string(),
            auto_refresh: true,
            refresh_interval: interval,
        }
    }

    #[test]
    fn test_refresh_interval_bounds() {
        assert!(config(29).validate().is_err());
        assert!(config(30).validate().is_ok());
        assert!(config(600).validate().is_ok());
        assert_eq!(
            config(601).validate().unwrap_err().field,
            "refreshInterval"
        );
    }

    #[test]
    fn test_url_scheme_required() {
        let mut cfg = config(60);
        cfg.url = "zabbix.example.com".to_string();
        assert_eq!(cfg.validate().unwrap_err().field, "url");
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = serde_json::json!({
            "url": "http://z",
            "username": "u",
            "password": "p",
            "apiVersion": "5.2",
            "autoRefresh": true,
            "refreshInterval": 45
        });
        let cfg: MonitoringConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.api_version_tuple(), (5, 2));
        assert_eq!(cfg.refresh_period(), Duration::from_secs(45));
    }

    #[test]
    fn test_auth_failures_never_retry() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(1, "Authentication failed: bad password"));
        assert!(!policy.should_retry(1, "HTTP 401 Unauthorized"));
        assert!(policy.should_retry(1, "connection reset"));
    }

    #[test]
    fn test_other_failures_retry_three_times() {
        let policy = RetryPolicy::default();
        let retries = (1..10)
            .take_while(|&failures| policy.should_retry(failures, "timeout"))
            .count();
        assert_eq!(retries, 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(5), Duration::from_secs(30));
        assert_eq!(policy.delay(40), Duration::from_secs(30));
    }
}
