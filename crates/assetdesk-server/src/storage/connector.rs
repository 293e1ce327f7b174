//! SQLite connectivity for the durable backend
//!
//! The pool handle is created lazily at start-up and a background task
//! establishes the first connection, publishing the settled outcome on a
//! watch channel that bootstrap waits on.

use super::db::SqliteStorage;
use super::migrations::MigrationRunner;
use assetdesk_core::ports::{DurableConnector, Storage};
use assetdesk_core::{DeskError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const RETRY_BASE: Duration = Duration::from_millis(250);
const RETRY_MAX: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ConnState {
    settled: bool,
    connected: bool,
}

pub struct SqlConnector {
    target: Option<String>,
    pool: Option<SqlitePool>,
    state: Arc<watch::Sender<ConnState>>,
}

impl SqlConnector {
    /// Create the connector and start connecting in the background.
    /// `connect_timeout` bounds the whole initial connect loop.
    pub fn spawn(url: Option<&str>, connect_timeout: Duration) -> Self {
        let (tx, _rx) = watch::channel(ConnState::default());
        let state = Arc::new(tx);

        let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
            info!("DATABASE_URL not set, durable storage unavailable");
            state.send_replace(ConnState {
                settled: true,
                connected: false,
            });
            return Self {
                target: None,
                pool: None,
                state,
            };
        };

        let pool = match Self::lazy_pool(url) {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Invalid DATABASE_URL: {}", e);
                state.send_replace(ConnState {
                    settled: true,
                    connected: false,
                });
                return Self {
                    target: Some(url.to_string()),
                    pool: None,
                    state,
                };
            }
        };

        tokio::spawn(Self::connect_loop(
            pool.clone(),
            Arc::clone(&state),
            connect_timeout,
        ));

        Self {
            target: Some(url.to_string()),
            pool: Some(pool),
            state,
        }
    }

    fn lazy_pool(url: &str) -> std::result::Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every connection to an in-memory database is a separate database.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        Ok(pool_options.connect_lazy_with(options))
    }

    async fn connect_loop(
        pool: SqlitePool,
        state: Arc<watch::Sender<ConnState>>,
        connect_timeout: Duration,
    ) {
        let deadline = Instant::now() + connect_timeout;
        let mut delay = RETRY_BASE;
        let mut attempt = 1u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, pool.acquire()).await {
                Ok(Ok(_conn)) => {
                    info!("Database connection established (attempt {})", attempt);
                    state.send_replace(ConnState {
                        settled: true,
                        connected: true,
                    });
                    return;
                }
                Ok(Err(e)) => debug!("Database connect attempt {} failed: {}", attempt, e),
                Err(_) => debug!("Database connect attempt {} timed out", attempt),
            }

            if Instant::now() + delay >= deadline {
                warn!(
                    "Database unreachable after {} attempts, giving up",
                    attempt
                );
                state.send_replace(ConnState {
                    settled: true,
                    connected: false,
                });
                return;
            }

            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(RETRY_MAX);
            attempt += 1;
        }
    }

    fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .as_ref()
            .ok_or_else(|| DeskError::Connection("no database handle".to_string()))
    }
}

#[async_trait]
impl DurableConnector for SqlConnector {
    fn has_target(&self) -> bool {
        self.target.is_some()
    }

    fn has_handle(&self) -> bool {
        self.pool.is_some()
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        let settled = match tokio::time::timeout(timeout, rx.wait_for(|s| s.settled)).await {
            Ok(Ok(state)) => Some(state.connected),
            _ => None,
        };
        settled.unwrap_or_else(|| self.is_connected())
    }

    async fn probe(&self) -> Result<u64> {
        let rows = sqlx::query("SELECT 1")
            .fetch_all(self.pool()?)
            .await
            .map_err(|e| DeskError::Connection(e.to_string()))?;
        Ok(rows.len() as u64)
    }

    async fn has_table(&self, table: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")
                .bind(table)
                .fetch_optional(self.pool()?)
                .await
                .map_err(|e| DeskError::Connection(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn migrate(&self) -> Result<Vec<i64>> {
        let pool = self
            .pool()
            .map_err(|e| DeskError::Migration(e.to_string()))?;
        MigrationRunner::new(pool).run().await
    }

    async fn open_storage(&self) -> Result<Arc<dyn Storage>> {
        let pool = self
            .pool()
            .map_err(|e| DeskError::BackendInit(e.to_string()))?;
        let storage = SqliteStorage::open(pool.clone()).await?;
        Ok(Arc::new(storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetdesk_core::BackendKind;

    #[tokio::test]
    async fn test_no_target() {
        let connector = SqlConnector::spawn(None, Duration::from_secs(1));

        assert!(!connector.has_target());
        assert!(!connector.has_handle());
        assert!(!connector.wait_ready(Duration::from_millis(50)).await);
        assert!(matches!(
            connector.probe().await,
            Err(DeskError::Connection(_))
        ));
        assert!(matches!(
            connector.migrate().await,
            Err(DeskError::Migration(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_database_full_cycle() {
        let connector = SqlConnector::spawn(Some("sqlite::memory:"), Duration::from_secs(5));

        assert!(connector.has_target());
        assert!(connector.has_handle());
        assert!(connector.wait_ready(Duration::from_secs(5)).await);
        assert_eq!(connector.probe().await.unwrap(), 1);
        assert!(!connector.has_table("users").await.unwrap());

        let applied = connector.migrate().await.unwrap();
        assert!(!applied.is_empty());
        assert!(connector.has_table("users").await.unwrap());

        let storage = connector.open_storage().await.unwrap();
        assert_eq!(storage.kind(), BackendKind::Durable);
    }

    #[tokio::test]
    async fn test_unreachable_database_settles_disconnected() {
        let connector = SqlConnector::spawn(
            Some("sqlite:///nonexistent-assetdesk-dir/nested/app.db"),
            Duration::from_millis(300),
        );

        assert!(connector.has_handle());
        assert!(!connector.wait_ready(Duration::from_secs(5)).await);
        assert!(!connector.is_connected());
    }

    #[tokio::test]
    async fn test_readiness_wait_times_out_before_settling() {
        let connector = SqlConnector::spawn(
            Some("sqlite:///nonexistent-assetdesk-dir/nested/app.db"),
            Duration::from_secs(30),
        );

        // The connect loop is still retrying, so the current flag is returned
        assert!(!connector.wait_ready(Duration::from_millis(20)).await);
    }
}
