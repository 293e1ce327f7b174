//! Durable backend connectivity

use crate::ports::Storage;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Three independent reachability signals, recomputed once per bootstrap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Connector reported connected when bootstrap started
    pub declared: bool,
    /// Connector reported connected after the readiness wait
    pub queried: bool,
    /// A direct probe query returned at least one row
    pub verified: bool,
}

impl ConnectionStatus {
    pub fn any(&self) -> bool {
        self.declared || self.queried || self.verified
    }

    /// Any single positive signal is enough to attempt durable storage,
    /// provided a target is configured and a handle exists.
    pub fn should_use_durable(&self, has_target: bool, has_handle: bool) -> bool {
        self.any() && has_target && has_handle
    }
}

/// Connection to the relational database backing durable storage
#[async_trait]
pub trait DurableConnector: Send + Sync {
    /// A connection target (URL) is configured
    fn has_target(&self) -> bool;

    /// A pool handle exists
    fn has_handle(&self) -> bool;

    /// Current connected flag
    fn is_connected(&self) -> bool;

    /// Wait until the initial connect attempt has settled. Returns the
    /// connected flag at that point, or the current one on timeout.
    async fn wait_ready(&self, timeout: Duration) -> bool;

    /// Run a trivial query and return the number of rows it produced
    async fn probe(&self) -> Result<u64>;

    async fn has_table(&self, table: &str) -> Result<bool>;

    /// Apply pending schema migrations, returning the versions applied
    async fn migrate(&self) -> Result<Vec<i64>>;

    /// Build the durable storage backend over the live handle
    async fn open_storage(&self) -> Result<Arc<dyn Storage>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_truth_table() {
        for bits in 0u8..8 {
            let status = ConnectionStatus {
                declared: bits & 0b001 != 0,
                queried: bits & 0b010 != 0,
                verified: bits & 0b100 != 0,
            };
            let expected = bits != 0;
            assert_eq!(status.should_use_durable(true, true), expected, "{:?}", status);
            assert!(!status.should_use_durable(false, true), "{:?}", status);
            assert!(!status.should_use_durable(true, false), "{:?}", status);
        }
    }
}
