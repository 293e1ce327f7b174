//! Zabbix JSON-RPC client behind the server-monitoring routes

use assetdesk_core::{
    ConnectionTestResult, DeskError, HostMetrics, HostStatus, MetricsSnapshot, MonitoringConfig,
    Problem, Result,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

const CPU_KEY: &str = "system.cpu.util";
const MEMORY_KEY: &str = "vm.memory.utilization";
const UPTIME_KEY: &str = "system.uptime";
const PROBLEM_LIMIT: u32 = 100;

pub struct ZabbixClient {
    http: reqwest::Client,
}

impl ZabbixClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeskError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Reads the API version, then checks the credentials
    pub async fn test_connection(&self, config: &MonitoringConfig) -> Result<ConnectionTestResult> {
        let endpoint = endpoint(&config.url);
        let version: String = self
            .call(&endpoint, "apiinfo.version", json!({}), None)
            .await?;
        debug!("Zabbix at {} reports API {}", endpoint, version);

        self.login(&endpoint, config).await?;
        info!("Zabbix connection test succeeded for {}", endpoint);

        Ok(ConnectionTestResult {
            success: true,
            message: format!("Connected to Zabbix API {}", version),
            version: Some(version),
        })
    }

    pub async fn fetch_metrics(&self, config: &MonitoringConfig) -> Result<MetricsSnapshot> {
        let endpoint = endpoint(&config.url);
        let token = self.login(&endpoint, config).await?;
        let session = Session {
            endpoint: &endpoint,
            token: &token,
            header_auth: config.api_version_tuple() >= (6, 4),
        };

        let raw_hosts: Vec<RawHost> = self
            .authed(
                &session,
                "host.get",
                json!({
                    "output": ["hostid", "name", "status"],
                    "selectInterfaces": ["available"],
                }),
            )
            .await?;

        let host_ids: Vec<&str> = raw_hosts.iter().map(|h| h.hostid.as_str()).collect();
        let items: Vec<RawItem> = if host_ids.is_empty() {
            Vec::new()
        } else {
            self.authed(
                &session,
                "item.get",
                json!({
                    "output": ["hostid", "key_", "lastvalue"],
                    "hostids": host_ids,
                    "filter": { "key_": [CPU_KEY, MEMORY_KEY, UPTIME_KEY] },
                }),
            )
            .await?
        };

        let raw_problems: Vec<RawProblem> = self
            .authed(
                &session,
                "problem.get",
                json!({
                    "output": ["eventid", "objectid", "name", "severity", "clock", "acknowledged"],
                    "recent": true,
                    "sortfield": ["eventid"],
                    "sortorder": "DESC",
                    "limit": PROBLEM_LIMIT,
                }),
            )
            .await?;

        let trigger_hosts = if raw_problems.is_empty() {
            HashMap::new()
        } else {
            let trigger_ids: Vec<&str> = raw_problems.iter().map(|p| p.objectid.as_str()).collect();
            let triggers: Vec<RawTrigger> = self
                .authed(
                    &session,
                    "trigger.get",
                    json!({
                        "output": ["triggerid"],
                        "triggerids": trigger_ids,
                        "selectHosts": ["name"],
                    }),
                )
                .await?;
            triggers
                .into_iter()
                .filter_map(|t| {
                    let host = t.hosts.into_iter().next()?;
                    Some((t.triggerid, host.name))
                })
                .collect()
        };

        Ok(MetricsSnapshot {
            hosts: assemble_hosts(raw_hosts, items),
            problems: raw_problems
                .into_iter()
                .map(|p| p.into_problem(&trigger_hosts))
                .collect(),
            fetched_at: Utc::now(),
        })
    }

    async fn login(&self, endpoint: &str, config: &MonitoringConfig) -> Result<String> {
        // 5.4 renamed the login parameter from `user` to `username`
        let user_param = if config.api_version_tuple() >= (5, 4) {
            "username"
        } else {
            "user"
        };
        let mut params = json!({ "password": config.password });
        params[user_param] = json!(config.username);

        self.rpc(endpoint, "user.login", params, None)
            .await
            .map_err(|e| match e {
                CallError::Rejected(message) => DeskError::Authentication(message),
                CallError::Transport(e) => e,
            })
    }

    async fn authed<T: DeserializeOwned>(
        &self,
        session: &Session<'_>,
        method: &str,
        params: Value,
    ) -> Result<T> {
        self.call(session.endpoint, method, params, Some(session))
            .await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: &str,
        params: Value,
        session: Option<&Session<'_>>,
    ) -> Result<T> {
        self.rpc(endpoint, method, params, session)
            .await
            .map_err(|e| match e {
                CallError::Rejected(message) => DeskError::Upstream(message),
                CallError::Transport(e) => e,
            })
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: &str,
        params: Value,
        session: Option<&Session<'_>>,
    ) -> std::result::Result<T, CallError> {
        let mut body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let mut request = self.http.post(endpoint);
        if let Some(session) = session {
            if session.header_auth {
                request = request.bearer_auth(session.token);
            } else {
                body["auth"] = json!(session.token);
            }
        }

        let response = request.json(&body).send().await.map_err(|e| {
            CallError::Transport(DeskError::Upstream(format!("Zabbix unreachable: {}", e)))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CallError::Transport(DeskError::Authentication(
                "Zabbix returned 401".to_string(),
            )));
        }
        if !status.is_success() {
            return Err(CallError::Transport(DeskError::Upstream(format!(
                "Zabbix returned HTTP {}",
                status
            ))));
        }

        let envelope: RpcResponse<T> = response.json().await.map_err(|e| {
            CallError::Transport(DeskError::Upstream(format!(
                "unreadable Zabbix response: {}",
                e
            )))
        })?;

        match (envelope.result, envelope.error) {
            (_, Some(err)) => Err(CallError::Rejected(err.describe())),
            (Some(result), None) => Ok(result),
            (None, None) => Err(CallError::Transport(DeskError::Upstream(format!(
                "{} returned no result",
                method
            )))),
        }
    }
}

/// Transport failures versus errors reported by the API itself
enum CallError {
    Transport(DeskError),
    Rejected(String),
}

struct Session<'a> {
    endpoint: &'a str,
    token: &'a str,
    header_auth: bool,
}

/// Accepts either the server root or the full `api_jsonrpc.php` URL
fn endpoint(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.ends_with("api_jsonrpc.php") {
        url.to_string()
    } else {
        format!("{}/api_jsonrpc.php", url)
    }
}

fn assemble_hosts(raw_hosts: Vec<RawHost>, items: Vec<RawItem>) -> Vec<HostMetrics> {
    let mut values: HashMap<(String, String), f64> = HashMap::new();
    for item in items {
        if let Ok(v) = item.lastvalue.parse::<f64>() {
            values.insert((item.hostid, item.key_), v);
        }
    }

    raw_hosts
        .into_iter()
        .map(|h| {
            let lookup = |key: &str| values.get(&(h.hostid.clone(), key.to_string())).copied();
            HostMetrics {
                status: h.availability(),
                enabled: h.status == "0",
                cpu_utilization: lookup(CPU_KEY),
                memory_utilization: lookup(MEMORY_KEY),
                uptime_seconds: lookup(UPTIME_KEY).map(|v| v.max(0.0) as u64),
                hostid: h.hostid,
                name: h.name,
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

impl RpcError {
    fn describe(&self) -> String {
        match &self.data {
            Some(data) if !data.is_empty() => format!("{} ({}): {}", self.message, self.code, data),
            _ => format!("{} ({})", self.message, self.code),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHost {
    hostid: String,
    name: String,
    status: String,
    #[serde(default)]
    interfaces: Vec<RawInterface>,
}

impl RawHost {
    fn availability(&self) -> HostStatus {
        if self.interfaces.iter().any(|i| i.available == "1") {
            HostStatus::Up
        } else if !self.interfaces.is_empty() && self.interfaces.iter().all(|i| i.available == "2")
        {
            HostStatus::Down
        } else {
            HostStatus::Unknown
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInterface {
    available: String,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    hostid: String,
    key_: String,
    lastvalue: String,
}

#[derive(Debug, Deserialize)]
struct RawProblem {
    eventid: String,
    objectid: String,
    name: String,
    severity: String,
    clock: String,
    acknowledged: String,
}

impl RawProblem {
    fn into_problem(self, trigger_hosts: &HashMap<String, String>) -> Problem {
        let clock = self
            .clock
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_default();
        Problem {
            host: trigger_hosts.get(&self.objectid).cloned(),
            severity: self.severity.parse::<u8>().unwrap_or(0).min(5),
            acknowledged: self.acknowledged == "1",
            eventid: self.eventid,
            name: self.name,
            clock,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTrigger {
    triggerid: String,
    #[serde(default)]
    hosts: Vec<RawTriggerHost>,
}

#[derive(Debug, Deserialize)]
struct RawTriggerHost {
    name: String,
}
