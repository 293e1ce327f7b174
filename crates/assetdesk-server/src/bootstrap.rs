//! Start-up storage selection
//!
//! Runs once before the listener accepts connections:
//! 1. assess connectivity (entry flag, flag after readiness wait, direct probe)
//! 2. pick durable storage if any signal is positive and a target + handle exist
//! 3. migrate, open and swap in the durable backend; on failure stay in memory
//! 4. make sure the admin account exists on whichever backend is active
//!
//! No step aborts start-up. Every external call is bounded by `step_timeout`.

use crate::events::EventLog;
use crate::services::auth::hash_password;
use crate::storage::StorageHandle;
use assetdesk_core::ports::{ConnectionStatus, DurableConnector, Storage, UserStore};
use assetdesk_core::{BackendKind, DeskError, NewUser, Permissions, Result, ADMIN_USERNAME};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Table whose absence is reported (never acted on) by the secondary probe
const EXPECTED_TABLE: &str = "users";

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub readiness_timeout: Duration,
    pub step_timeout: Duration,
    pub admin_check_delay: Duration,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            readiness_timeout: Duration::from_secs(10),
            step_timeout: Duration::from_secs(15),
            admin_check_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub password: String,
    pub email: Option<String>,
}

impl AdminCredentials {
    /// Uses the configured password, or generates one and logs it once
    pub fn resolve(password: Option<String>, email: Option<String>) -> Self {
        let password = match password.filter(|p| !p.is_empty()) {
            Some(password) => password,
            None => {
                let generated = crate::config::random_secret(20);
                warn!(
                    "ADMIN_PASSWORD not set. If the '{}' account is created now its password is: {}",
                    ADMIN_USERNAME, generated
                );
                generated
            }
        };
        Self { password, email }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    Existing,
    Created,
    Failed,
}

#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub status: ConnectionStatus,
    pub selected: BackendKind,
    pub active: BackendKind,
    pub migrations_applied: Vec<i64>,
    pub admin: AdminOutcome,
}

pub struct Bootstrap<'a> {
    connector: &'a dyn DurableConnector,
    storage: &'a StorageHandle,
    events: &'a EventLog,
    options: BootstrapOptions,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        connector: &'a dyn DurableConnector,
        storage: &'a StorageHandle,
        events: &'a EventLog,
        options: BootstrapOptions,
    ) -> Self {
        Self {
            connector,
            storage,
            events,
            options,
        }
    }

    pub async fn run(&self, admin: &AdminCredentials) -> BootstrapReport {
        let status = self.assess().await;
        let use_durable =
            status.should_use_durable(self.connector.has_target(), self.connector.has_handle());
        let selected = if use_durable {
            BackendKind::Durable
        } else {
            BackendKind::Memory
        };
        info!(
            "Connection status: declared={}, queried={}, verified={} -> {} storage",
            status.declared, status.queried, status.verified, selected
        );

        let mut migrations_applied = Vec::new();
        if use_durable {
            match self.activate_durable().await {
                Ok(applied) => {
                    info!("Durable storage active ({} migrations applied)", applied.len());
                    migrations_applied = applied;
                }
                Err(e) => {
                    error!("Durable storage unavailable, continuing in memory: {}", e);
                    self.events
                        .system("storage_fallback", format!("falling back to in-memory storage: {}", e))
                        .await;
                }
            }
        } else {
            info!("Using in-memory storage, data will not survive a restart");
        }

        if !self.options.admin_check_delay.is_zero() {
            tokio::time::sleep(self.options.admin_check_delay).await;
        }

        let admin = match bounded(
            self.options.step_timeout,
            "admin bootstrap",
            ensure_admin(self.storage, admin, self.events),
            DeskError::AdminBootstrap,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Could not ensure admin account: {}", e);
                AdminOutcome::Failed
            }
        };

        BootstrapReport {
            status,
            selected,
            active: self.storage.kind(),
            migrations_applied,
            admin,
        }
    }

    async fn assess(&self) -> ConnectionStatus {
        let declared = self.connector.is_connected();
        let queried = self
            .connector
            .wait_ready(self.options.readiness_timeout)
            .await;

        let mut verified = false;
        if self.connector.has_target() && self.connector.has_handle() {
            match bounded(
                self.options.step_timeout,
                "connection probe",
                self.connector.probe(),
                DeskError::Connection,
            )
            .await
            {
                Ok(rows) => verified = rows > 0,
                Err(e) => warn!("Direct database probe failed: {}", e),
            }

            match bounded(
                self.options.step_timeout,
                "table probe",
                self.connector.has_table(EXPECTED_TABLE),
                DeskError::Connection,
            )
            .await
            {
                Ok(true) => debug!("Table '{}' present", EXPECTED_TABLE),
                Ok(false) => warn!(
                    "Table '{}' not found, migrations are expected to create it",
                    EXPECTED_TABLE
                ),
                Err(e) => warn!("Table probe failed: {}", e),
            }
        }

        ConnectionStatus {
            declared,
            queried,
            verified,
        }
    }

    /// Migrate, build the backend, then swap. Nothing is swapped unless
    /// both steps succeed.
    async fn activate_durable(&self) -> Result<Vec<i64>> {
        let applied = bounded(
            self.options.step_timeout,
            "migrations",
            self.connector.migrate(),
            DeskError::Migration,
        )
        .await?;

        let backend = bounded(
            self.options.step_timeout,
            "backend construction",
            self.connector.open_storage(),
            DeskError::BackendInit,
        )
        .await?;

        self.storage.swap(backend);
        Ok(applied)
    }
}

/// Create the admin account on the active backend unless it exists
pub async fn ensure_admin(
    storage: &StorageHandle,
    credentials: &AdminCredentials,
    events: &EventLog,
) -> Result<AdminOutcome> {
    if storage
        .get_user_by_username(ADMIN_USERNAME)
        .await
        .map_err(|e| DeskError::AdminBootstrap(e.to_string()))?
        .is_some()
    {
        info!("Admin account present on {} storage", storage.kind());
        return Ok(AdminOutcome::Existing);
    }

    let password_hash = hash_password(&credentials.password)
        .map_err(|e| DeskError::AdminBootstrap(e.to_string()))?;

    let created = storage
        .create_user(NewUser {
            username: ADMIN_USERNAME.to_string(),
            password_hash,
            first_name: Some("System".to_string()),
            last_name: Some("Administrator".to_string()),
            email: credentials.email.clone(),
            department: Some("IT".to_string()),
            is_admin: true,
            permissions: Permissions::full(),
        })
        .await;

    match created {
        Ok(user) => {
            info!("Admin account created on {} storage", storage.kind());
            events
                .system(
                    "admin_created",
                    format!("default admin account {} created", user.id),
                )
                .await;
            Ok(AdminOutcome::Created)
        }
        // Someone else created it between the lookup and the insert
        Err(DeskError::Conflict(_)) => Ok(AdminOutcome::Existing),
        Err(e) => Err(DeskError::AdminBootstrap(e.to_string())),
    }
}

async fn bounded<T, F>(
    limit: Duration,
    step: &str,
    fut: F,
    on_timeout: fn(String) -> DeskError,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(format!("{} timed out after {:?}", step, limit))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testing::{CollectingSink, FailingSink};
    use crate::storage::db::memory_pool;
    use crate::storage::db::SqliteStorage;
    use crate::storage::migrations::MigrationRunner;
    use crate::storage::MemoryStorage;
    use assetdesk_core::User;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeConnector {
        target: bool,
        handle: bool,
        declared: bool,
        queried: bool,
        probe_rows: Option<u64>,
        has_users_table: bool,
        migrate_ok: bool,
        durable: Option<Arc<dyn Storage>>,
        migrate_calls: AtomicUsize,
        hang_probe: bool,
    }

    impl FakeConnector {
        fn offline() -> Self {
            Self {
                target: false,
                handle: false,
                declared: false,
                queried: false,
                probe_rows: None,
                has_users_table: false,
                migrate_ok: true,
                durable: None,
                migrate_calls: AtomicUsize::new(0),
                hang_probe: false,
            }
        }

        fn online(durable: Arc<dyn Storage>) -> Self {
            Self {
                target: true,
                handle: true,
                declared: true,
                queried: true,
                probe_rows: Some(1),
                has_users_table: true,
                durable: Some(durable),
                ..Self::offline()
            }
        }
    }

    #[async_trait]
    impl DurableConnector for FakeConnector {
        fn has_target(&self) -> bool {
            self.target
        }

        fn has_handle(&self) -> bool {
            self.handle
        }

        fn is_connected(&self) -> bool {
            self.declared
        }

        async fn wait_ready(&self, _timeout: Duration) -> bool {
            self.queried
        }

        async fn probe(&self) -> Result<u64> {
            if self.hang_probe {
                std::future::pending::<()>().await;
            }
            self.probe_rows
                .ok_or_else(|| DeskError::Connection("refused".to_string()))
        }

        async fn has_table(&self, _table: &str) -> Result<bool> {
            Ok(self.has_users_table)
        }

        async fn migrate(&self) -> Result<Vec<i64>> {
            self.migrate_calls.fetch_add(1, Ordering::SeqCst);
            if self.migrate_ok {
                Ok(vec![1])
            } else {
                Err(DeskError::Migration("syntax error".to_string()))
            }
        }

        async fn open_storage(&self) -> Result<Arc<dyn Storage>> {
            self.durable
                .clone()
                .ok_or_else(|| DeskError::BackendInit("no backend".to_string()))
        }
    }

    fn options() -> BootstrapOptions {
        BootstrapOptions {
            readiness_timeout: Duration::from_millis(10),
            step_timeout: Duration::from_millis(500),
            admin_check_delay: Duration::ZERO,
        }
    }

    fn creds() -> AdminCredentials {
        AdminCredentials {
            password: "admin-pass".to_string(),
            email: Some("it@example.com".to_string()),
        }
    }

    fn memory_handle() -> StorageHandle {
        StorageHandle::new(Arc::new(MemoryStorage::new()))
    }

    async fn durable_backend() -> Arc<SqliteStorage> {
        let pool = memory_pool().await;
        MigrationRunner::new(&pool).run().await.unwrap();
        Arc::new(SqliteStorage::open(pool).await.unwrap())
    }

    fn quiet_log() -> EventLog {
        EventLog::new(Arc::new(CollectingSink::default()))
    }

    #[tokio::test]
    async fn test_selection_over_all_signal_combinations() {
        for bits in 0u8..8 {
            let durable = durable_backend().await;
            let mut connector = FakeConnector::online(durable);
            connector.declared = bits & 0b001 != 0;
            connector.queried = bits & 0b010 != 0;
            connector.probe_rows = Some(if bits & 0b100 != 0 { 1 } else { 0 });

            let storage = memory_handle();
            let log = quiet_log();
            let report = Bootstrap::new(&connector, &storage, &log, options())
                .run(&creds())
                .await;

            let expected = if bits == 0 {
                BackendKind::Memory
            } else {
                BackendKind::Durable
            };
            assert_eq!(report.selected, expected, "signals {:03b}", bits);
            assert_eq!(report.active, expected, "signals {:03b}", bits);
        }
    }

    #[tokio::test]
    async fn test_no_target_stays_in_memory() {
        let connector = FakeConnector::offline();
        let storage = memory_handle();
        let log = quiet_log();

        let report = Bootstrap::new(&connector, &storage, &log, options())
            .run(&creds())
            .await;

        assert_eq!(report.active, BackendKind::Memory);
        assert_eq!(connector.migrate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.admin, AdminOutcome::Created);
    }

    #[tokio::test]
    async fn test_target_without_handle_stays_in_memory() {
        let mut connector = FakeConnector::online(durable_backend().await);
        connector.handle = false;
        let storage = memory_handle();
        let log = quiet_log();

        let report = Bootstrap::new(&connector, &storage, &log, options())
            .run(&creds())
            .await;

        assert_eq!(report.selected, BackendKind::Memory);
        assert_eq!(connector.migrate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_migration_failure_keeps_original_backend() {
        let mut connector = FakeConnector::online(durable_backend().await);
        connector.migrate_ok = false;

        let original: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let storage = StorageHandle::new(Arc::clone(&original));
        let log = quiet_log();

        let report = Bootstrap::new(&connector, &storage, &log, options())
            .run(&creds())
            .await;

        assert_eq!(report.selected, BackendKind::Durable);
        assert_eq!(report.active, BackendKind::Memory);
        assert!(Arc::ptr_eq(&storage.current(), &original));
        // Admin still lands on the in-memory backend
        assert!(original
            .get_user_by_username(ADMIN_USERNAME)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_backend_construction_failure_keeps_original_backend() {
        let mut connector = FakeConnector::online(durable_backend().await);
        connector.durable = None;

        let original: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let storage = StorageHandle::new(Arc::clone(&original));
        let log = quiet_log();

        let report = Bootstrap::new(&connector, &storage, &log, options())
            .run(&creds())
            .await;

        assert_eq!(report.active, BackendKind::Memory);
        assert!(Arc::ptr_eq(&storage.current(), &original));
    }

    #[tokio::test]
    async fn test_success_delegates_to_durable_backend() {
        let durable = durable_backend().await;
        let connector = FakeConnector::online(durable.clone());
        let storage = memory_handle();
        let log = quiet_log();

        let report = Bootstrap::new(&connector, &storage, &log, options())
            .run(&creds())
            .await;
        assert_eq!(report.active, BackendKind::Durable);
        assert_eq!(report.migrations_applied, vec![1]);

        // Admin was created through the handle and is visible in SQLite
        let admin: User = durable
            .get_user_by_username(ADMIN_USERNAME)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin);

        // create_user through the handle lands in the durable backend
        storage
            .create_user(NewUser {
                username: "jdoe".to_string(),
                password_hash: "h".to_string(),
                first_name: None,
                last_name: None,
                email: None,
                department: None,
                is_admin: false,
                permissions: Permissions::default_user(),
            })
            .await
            .unwrap();
        assert!(durable.get_user_by_username("jdoe").await.unwrap().is_some());

        // get_user_by_username through the handle reads the durable backend
        let via_handle = storage
            .get_user_by_username(ADMIN_USERNAME)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(via_handle.id, admin.id);
    }

    #[tokio::test]
    async fn test_missing_table_does_not_gate_selection() {
        let mut connector = FakeConnector::online(durable_backend().await);
        connector.has_users_table = false;
        let storage = memory_handle();
        let log = quiet_log();

        let report = Bootstrap::new(&connector, &storage, &log, options())
            .run(&creds())
            .await;
        assert_eq!(report.active, BackendKind::Durable);
    }

    #[tokio::test]
    async fn test_hung_probe_is_bounded() {
        let mut connector = FakeConnector::online(durable_backend().await);
        connector.declared = false;
        connector.queried = false;
        connector.hang_probe = true;
        let storage = memory_handle();
        let log = quiet_log();

        let mut opts = options();
        opts.step_timeout = Duration::from_millis(50);
        let report = Bootstrap::new(&connector, &storage, &log, opts)
            .run(&creds())
            .await;

        assert!(!report.status.verified);
        assert_eq!(report.active, BackendKind::Memory);
    }

    #[tokio::test]
    async fn test_admin_bootstrap_is_idempotent() {
        let storage = memory_handle();
        let log = quiet_log();

        let first = ensure_admin(&storage, &creds(), &log).await.unwrap();
        let second = ensure_admin(&storage, &creds(), &log).await.unwrap();

        assert_eq!(first, AdminOutcome::Created);
        assert_eq!(second, AdminOutcome::Existing);
        let admins = storage
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .filter(|u| u.username == ADMIN_USERNAME)
            .count();
        assert_eq!(admins, 1);
    }

    #[tokio::test]
    async fn test_admin_created_despite_failing_event_log() {
        let storage = memory_handle();
        let log = EventLog::new(Arc::new(FailingSink));

        let outcome = ensure_admin(&storage, &creds(), &log).await.unwrap();
        assert_eq!(outcome, AdminOutcome::Created);

        let admin = storage
            .get_user_by_username(ADMIN_USERNAME)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin);
        assert_eq!(admin.permissions, Permissions::full());
    }

    #[test]
    fn test_generated_admin_password() {
        let creds = AdminCredentials::resolve(None, None);
        assert_eq!(creds.password.len(), 20);

        let creds = AdminCredentials::resolve(Some("configured".to_string()), None);
        assert_eq!(creds.password, "configured");
    }
}
