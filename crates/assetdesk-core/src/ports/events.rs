//! Event sink port

use crate::events::LogEvent;
use crate::Result;
use async_trait::async_trait;

/// Durable destination for event log records
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist one record. Failures are reported as `DeskError::Logging`.
    async fn write(&self, event: &LogEvent) -> Result<()>;
}
