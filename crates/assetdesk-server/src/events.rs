//! External event logger
//!
//! Best-effort side channel. Nothing here may fail the caller: sink errors
//! are reported through `tracing` and dropped.

use crate::storage::StorageHandle;
use assetdesk_core::events::{ApiRequestRecord, EventKind, EventLevel, LifecyclePhase, LogEvent};
use assetdesk_core::ports::{EventSink, Storage};
use assetdesk_core::{DeskError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Appends one JSON object per line
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl EventSink for JsonlSink {
    async fn write(&self, event: &LogEvent) -> Result<()> {
        let mut line =
            serde_json::to_string(event).map_err(|e| DeskError::Logging(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DeskError::Logging(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DeskError::Logging(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| DeskError::Logging(e.to_string()))?;
        Ok(())
    }
}

/// Fallback sink that only emits tracing records
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn write(&self, event: &LogEvent) -> Result<()> {
        let json = serde_json::to_string(event).map_err(|e| DeskError::Logging(e.to_string()))?;
        tracing::info!(target: "assetdesk::events", category = event.category(), "{}", json);
        Ok(())
    }
}

pub struct EventLog {
    sink: Arc<dyn EventSink>,
}

impl EventLog {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// File sink under `data_dir`, or the tracing sink if the directory
    /// cannot be created
    pub async fn open(data_dir: &Path) -> Self {
        match tokio::fs::create_dir_all(data_dir).await {
            Ok(()) => Self::new(Arc::new(JsonlSink::new(data_dir.join("events.jsonl")))),
            Err(e) => {
                warn!(
                    "Event log directory {} unavailable ({}), logging events to tracing only",
                    data_dir.display(),
                    e
                );
                Self::new(Arc::new(TracingSink))
            }
        }
    }

    /// Write one record, swallowing sink failures
    pub async fn record(&self, level: EventLevel, kind: EventKind) {
        let event = LogEvent::new(level, kind);
        if let Err(e) = self.sink.write(&event).await {
            warn!("Event log write failed ({}): {}", event.category(), e);
        }
    }

    pub async fn lifecycle(&self, phase: LifecyclePhase, reason: Option<&str>) {
        self.record(
            EventLevel::Info,
            EventKind::Lifecycle {
                phase,
                reason: reason.map(str::to_string),
            },
        )
        .await
    }

    pub async fn system(&self, action: &str, message: impl Into<String>) {
        self.record(
            EventLevel::Info,
            EventKind::System {
                action: action.to_string(),
                message: message.into(),
            },
        )
        .await
    }

    pub async fn api_request(&self, record: ApiRequestRecord) {
        let level = if record.status >= 500 {
            EventLevel::Error
        } else if record.status >= 400 {
            EventLevel::Warn
        } else {
            EventLevel::Info
        };
        self.record(level, EventKind::ApiRequest(record)).await
    }

    pub async fn critical(&self, origin: &str, message: impl Into<String>) {
        self.record(
            EventLevel::Critical,
            EventKind::Critical {
                origin: origin.to_string(),
                message: message.into(),
            },
        )
        .await
    }
}

/// Periodic liveness record, stopped through `cancel`
pub fn spawn_heartbeat(
    log: Arc<EventLog>,
    storage: Arc<StorageHandle>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let started = Instant::now();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; skip it so the first
        // heartbeat lands one period after start-up.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Heartbeat stopped");
                    return;
                }
                _ = interval.tick() => {
                    log.record(
                        EventLevel::Info,
                        EventKind::Heartbeat {
                            uptime_secs: started.elapsed().as_secs(),
                            storage: storage.kind(),
                            pid: std::process::id(),
                        },
                    )
                    .await;
                }
            }
        }
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Keeps records in memory
    #[derive(Default)]
    pub struct CollectingSink {
        pub events: std::sync::Mutex<Vec<LogEvent>>,
    }

    impl CollectingSink {
        pub fn categories(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.category())
                .collect()
        }
    }

    #[async_trait]
    impl EventSink for CollectingSink {
        async fn write(&self, event: &LogEvent) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    /// Always fails
    pub struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        async fn write(&self, _event: &LogEvent) -> Result<()> {
            Err(DeskError::Logging("disk full".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{CollectingSink, FailingSink};
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_jsonl_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::open(dir.path()).await;

        log.lifecycle(LifecyclePhase::Startup, Some("boot")).await;
        log.system("admin_created", "Default admin account created")
            .await;

        let content = tokio::fs::read_to_string(dir.path().join("events.jsonl"))
            .await
            .unwrap();
        let events: Vec<LogEvent> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].category(), "lifecycle");
        assert_eq!(
            events[1].kind,
            EventKind::System {
                action: "admin_created".to_string(),
                message: "Default admin account created".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_failing_sink_is_swallowed() {
        let log = EventLog::new(Arc::new(FailingSink));
        log.critical("test", "still fine").await;
        log.api_request(ApiRequestRecord {
            method: "GET".to_string(),
            path: "/api/assets".to_string(),
            status: 200,
            duration_ms: 3,
            response_body: None,
            actor: None,
            remote_addr: None,
            user_agent: None,
        })
        .await;
    }

    #[tokio::test]
    async fn test_api_request_level_follows_status() {
        let sink = Arc::new(CollectingSink::default());
        let log = EventLog::new(sink.clone());

        for status in [200u16, 404, 502] {
            log.api_request(ApiRequestRecord {
                method: "GET".to_string(),
                path: "/api/x".to_string(),
                status,
                duration_ms: 1,
                response_body: None,
                actor: None,
                remote_addr: None,
                user_agent: None,
            })
            .await;
        }

        let levels: Vec<EventLevel> = sink
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.level)
            .collect();
        assert_eq!(
            levels,
            vec![EventLevel::Info, EventLevel::Warn, EventLevel::Error]
        );
    }

    #[tokio::test]
    async fn test_heartbeat_stops_on_cancel() {
        let sink = Arc::new(CollectingSink::default());
        let log = Arc::new(EventLog::new(sink.clone()));
        let storage = Arc::new(StorageHandle::new(Arc::new(MemoryStorage::new())));
        let cancel = CancellationToken::new();

        let task = spawn_heartbeat(log, storage, Duration::from_millis(10), cancel.clone());
        tokio::time::sleep(Duration::from_millis(60)).await;
        cancel.cancel();
        task.await.unwrap();

        let beats = sink.categories().len();
        assert!(beats >= 1);
        assert!(sink.categories().iter().all(|c| *c == "heartbeat"));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sink.categories().len(), beats);
    }
}
