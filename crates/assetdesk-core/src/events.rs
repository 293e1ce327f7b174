//! Event log records
//!
//! Records written to the external event log. Each record carries a
//! category tag so the log can be filtered without parsing messages.

use assetdesk_types::BackendKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a response body kept in an api-request record
pub const MAX_LOGGED_BODY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Startup,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequestRecord {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: u64,
    pub response_body: Option<String>,
    pub actor: Option<String>,
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EventKind {
    Lifecycle {
        phase: LifecyclePhase,
        reason: Option<String>,
    },
    System {
        action: String,
        message: String,
    },
    ApiRequest(ApiRequestRecord),
    Heartbeat {
        uptime_secs: u64,
        storage: BackendKind,
        pid: u32,
    },
    Critical {
        origin: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl LogEvent {
    pub fn new(level: EventLevel, kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            kind,
        }
    }

    pub fn category(&self) -> &'static str {
        match self.kind {
            EventKind::Lifecycle { .. } => "lifecycle",
            EventKind::System { .. } => "system",
            EventKind::ApiRequest(_) => "api_request",
            EventKind::Heartbeat { .. } => "heartbeat",
            EventKind::Critical { .. } => "critical",
        }
    }
}

/// Cut a body down to `MAX_LOGGED_BODY` characters on a char boundary
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_LOGGED_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
