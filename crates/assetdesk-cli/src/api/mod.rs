//! API client for the AssetDesk server

use anyhow::{Context, Result};
use assetdesk_types::{ConnectionTestResult, MetricsSnapshot, MonitoringConfig, User};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Settings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub user: User,
}

pub struct Client {
    http: ReqwestClient,
    base_url: String,
    token: Option<String>,
}

impl Client {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let http = ReqwestClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.server_url, settings.access_token.clone())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let request = self
            .http
            .post(format!("{}/api/login", self.base_url))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }));
        self.send(request, "Login").await
    }

    pub async fn me(&self) -> Result<User> {
        let request = self.authed(self.http.get(format!("{}/api/me", self.base_url)))?;
        self.send(request, "Fetching current user").await
    }

    pub async fn test_connection(&self, config: &MonitoringConfig) -> Result<ConnectionTestResult> {
        let request = self.authed(
            self.http
                .post(format!("{}/api/server-monitoring/test-connection", self.base_url))
                .json(config),
        )?;
        self.send(request, "Connection test").await
    }

    pub async fn fetch_metrics(&self, config: &MonitoringConfig) -> Result<MetricsSnapshot> {
        let request = self.authed(
            self.http
                .post(format!("{}/api/server-monitoring/metrics", self.base_url))
                .json(config),
        )?;
        self.send(request, "Fetching metrics").await
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .context("Not logged in. Run `assetdesk login` first")?;
        Ok(request.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("{} request failed", what))?;
        parse_response(response, what).await
    }
}

/// Non-2xx bodies carry `{message}`; the status code is kept in the error
/// text so callers can spot `401`
async fn parse_response<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let error: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        anyhow::bail!(
            "{} failed: {} ({})",
            what,
            error["message"].as_str().unwrap_or("unexpected response"),
            status
        );
    }

    serde_json::from_str(&body).with_context(|| format!("Failed to parse {} response", what))
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::net::SocketAddr;

    /// Server that accepts password `zabbix`, counting metrics calls
    pub async fn fake_server(
        metrics_calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    ) -> SocketAddr {
        let app = Router::new()
            .route(
                "/api/login",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "admin-pass" {
                        (
                            StatusCode::OK,
                            Json(json!({
                                "access_token": "tok",
                                "expires_in": 43200,
                                "user": {
                                    "id": "u1", "username": "admin", "isAdmin": true,
                                    "firstName": null, "lastName": null, "email": null,
                                    "department": null, "permissions": {},
                                    "createdAt": "2024-01-01T00:00:00Z"
                                }
                            })),
                        )
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({ "message": "Authentication failed: invalid credentials" })),
                        )
                    }
                }),
            )
            .route(
                "/api/server-monitoring/test-connection",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "zabbix" {
                        (
                            StatusCode::OK,
                            Json(json!({ "success": true, "version": "6.0.21", "message": "ok" })),
                        )
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({ "message": "Authentication failed: Incorrect user name or password" })),
                        )
                    }
                }),
            )
            .route(
                "/api/server-monitoring/metrics",
                post(move || {
                    let calls = metrics_calls.clone();
                    async move {
                        let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        if n == 0 {
                            return (
                                StatusCode::BAD_GATEWAY,
                                Json(json!({ "message": "Upstream error: Zabbix unreachable" })),
                            );
                        }
                        (
                            StatusCode::OK,
                            Json(json!({
                                "hosts": [{
                                    "hostid": "1", "name": "web-01", "status": "up", "enabled": true,
                                    "cpuUtilization": 12.5, "memoryUtilization": 40.0, "uptimeSeconds": 90061
                                }],
                                "problems": [],
                                "fetchedAt": "2024-01-01T00:00:00Z"
                            })),
                        )
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}

#[cfg(test)]
mod tests {
    use super::testing::fake_server;
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_login_success_and_failure() {
        let addr = fake_server(Arc::new(AtomicUsize::new(0))).await;
        let client = Client::new(&format!("http://{}/", addr), None).unwrap();

        let response = client.login("admin", "admin-pass").await.unwrap();
        assert_eq!(response.access_token, "tok");
        assert!(response.user.is_admin);

        let err = client.login("admin", "wrong").await.unwrap_err().to_string();
        assert!(err.contains("Authentication"));
        assert!(err.contains("401"));
    }

    #[tokio::test]
    async fn test_monitoring_calls_require_token() {
        let client = Client::new("http://127.0.0.1:1", None).unwrap();
        let config = MonitoringConfig {
            url: "http://zabbix".to_string(),
            username: "Admin".to_string(),
            password: "zabbix".to_string(),
            api_version: "6.0".to_string(),
            auto_refresh: false,
            refresh_interval: 60,
        };

        let err = client.fetch_metrics(&config).await.unwrap_err();
        assert!(err.to_string().contains("Not logged in"));
    }
}
