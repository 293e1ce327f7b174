//! AssetDesk Server
//!
//! IT asset-management backend: users, hardware assets, licenses,
//! accessories and consumables over a JSON API, plus a Zabbix proxy for the
//! monitoring dashboard.
//!
//! Storage starts in memory. If `DATABASE_URL` points at a reachable SQLite
//! database the bootstrap sequence migrates it and swaps it in before the
//! listener opens.

mod bootstrap;
mod config;
mod error;
mod events;
mod extractors;
mod handlers;
mod middleware;
mod services;
mod storage;

use anyhow::{Context, Result};
use assetdesk_core::events::LifecyclePhase;
use assetdesk_core::ports::Storage;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bootstrap::{AdminCredentials, Bootstrap, BootstrapOptions, BootstrapReport};
use config::ServerConfig;
use events::{spawn_heartbeat, EventLog, TracingSink};
use services::{AuthService, ZabbixClient};
use storage::{MemoryStorage, SqlConnector, StorageHandle};

const ZABBIX_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<StorageHandle>,
    pub auth_service: Arc<AuthService>,
    pub events: Arc<EventLog>,
    pub zabbix: Arc<ZabbixClient>,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting AssetDesk Server v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            EventLog::new(Arc::new(TracingSink))
                .critical("config", format!("{:#}", e))
                .await;
            std::process::exit(1);
        }
    };

    let events = Arc::new(EventLog::open(&config.data_dir).await);
    install_panic_hook(Arc::clone(&events));

    if let Err(e) = run_server(config, Arc::clone(&events)).await {
        error!("Server failed: {:#}", e);
        events.critical("startup", format!("{:#}", e)).await;
        std::process::exit(1);
    }
}

/// Logs the panic, records it as a critical event, then defers to the
/// default hook
fn install_panic_hook(events: Arc<EventLog>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        tracing::error!("PANIC at {:?}: {}", location, payload);

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let events = Arc::clone(&events);
            let message = format!("{} at {}", payload, location.unwrap_or_default());
            runtime.spawn(async move { events.critical("panic", message).await });
        }

        default_hook(info);
    }));
}

async fn run_server(config: ServerConfig, events: Arc<EventLog>) -> Result<()> {
    info!(
        "Config loaded: bind={}, data_dir={}, database={}",
        config.bind_address,
        config.data_dir.display(),
        if config.database_url.is_some() { "configured" } else { "none" }
    );

    let (state, report) = build_state(&config, Arc::clone(&events)).await?;
    info!(
        "Bootstrap finished: signals={:?}, selected={}, active={}, migrations={:?}, admin={:?}",
        report.status, report.selected, report.active, report.migrations_applied, report.admin
    );

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Server listening on {}", addr);

    let storage = Arc::clone(&state.storage);
    events
        .lifecycle(
            LifecyclePhase::Startup,
            Some(&format!("listening on {} with {} storage", addr, storage.kind())),
        )
        .await;

    let cancel = CancellationToken::new();
    let heartbeat = spawn_heartbeat(
        Arc::clone(&events),
        storage,
        config.heartbeat_interval(),
        cancel.clone(),
    );

    let app = build_router(state);
    let shutdown = {
        let events = Arc::clone(&events);
        async move {
            let reason = shutdown_signal().await;
            info!("Received {}, shutting down", reason);
            events
                .lifecycle(LifecyclePhase::Shutdown, Some(reason))
                .await;
            cancel.cancel();
        }
    };

    info!("Server ready to accept connections");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("Server error")?;

    if let Err(e) = heartbeat.await {
        warn!("Heartbeat task ended abnormally: {}", e);
    }
    info!("Server stopped");
    Ok(())
}

/// Start with memory storage, run the bootstrap sequence, wire services
async fn build_state(
    config: &ServerConfig,
    events: Arc<EventLog>,
) -> Result<(AppState, BootstrapReport)> {
    let storage = Arc::new(StorageHandle::new(Arc::new(MemoryStorage::new())));
    let connector = SqlConnector::spawn(config.database_url.as_deref(), config.readiness_timeout());
    let admin = AdminCredentials::resolve(config.admin_password.clone(), config.admin_email.clone());

    let options = BootstrapOptions {
        readiness_timeout: config.readiness_timeout(),
        step_timeout: config.step_timeout(),
        admin_check_delay: config.admin_check_delay(),
    };
    let report = Bootstrap::new(&connector, &storage, &events, options)
        .run(&admin)
        .await;

    let zabbix = ZabbixClient::new(ZABBIX_TIMEOUT).context("Failed to build Zabbix client")?;
    let state = AppState {
        auth_service: Arc::new(AuthService::new(
            Arc::clone(&storage),
            config.jwt_secret.clone(),
        )),
        storage,
        events,
        zabbix: Arc::new(zabbix),
    };
    Ok((state, report))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    use handlers::{accessories, assets, consumables, licenses, monitoring, users};

    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/assets", get(assets::list).post(assets::create))
        .route(
            "/assets/:id",
            get(assets::get).put(assets::update).delete(assets::delete),
        )
        .route("/licenses", get(licenses::list).post(licenses::create))
        .route(
            "/licenses/:id",
            get(licenses::get).put(licenses::update).delete(licenses::delete),
        )
        .route(
            "/accessories",
            get(accessories::list).post(accessories::create),
        )
        .route(
            "/accessories/:id",
            get(accessories::get)
                .put(accessories::update)
                .delete(accessories::delete),
        )
        .route(
            "/consumables",
            get(consumables::list).post(consumables::create),
        )
        .route(
            "/consumables/:id",
            get(consumables::get)
                .put(consumables::update)
                .delete(consumables::delete),
        )
        .route(
            "/server-monitoring/test-connection",
            post(monitoring::test_connection),
        )
        .route("/server-monitoring/metrics", post(monitoring::metrics))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::record_api_request,
        ))
}

async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
