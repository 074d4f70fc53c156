//! # repairdeskd: repairdesk daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (`repairdesk.toml`, env vars)
//! - Initialize logging, the `SQLite` pool, and run migrations
//! - Make sure an admin user exists
//! - Construct the use-cases, injecting adapters via port traits
//! - Start the notification worker
//! - Serve the axum router until SIGINT/SIGTERM, then drain
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use repairdesk_adapter_http_axum::state::{AppState, Ports};
use repairdesk_adapter_storage_sqlite_sqlx::{
    SqliteDirectory, SqliteInventoryStore, SqliteRemovedPartRepository, SqliteRequestTracker,
    SqliteServiceRepository,
};
use repairdesk_app::notifications::{NotificationWorker, QueueDispatcher, TracingTransport};
use repairdesk_app::ports::Directory;
use repairdesk_app::services::allocation_coordinator::AllocationCoordinator;
use repairdesk_app::services::parts_inventory::PartsInventory;
use repairdesk_app::services::service_lifecycle::ServiceLifecycle;
use repairdesk_domain::directory::{Role, User};

use crate::config::Config;

/// Port implementations backed by the `SQLite` adapter.
struct SqlitePorts;

impl Ports for SqlitePorts {
    type Services = Arc<SqliteServiceRepository>;
    type RemovedParts = Arc<SqliteRemovedPartRepository>;
    type Inventory = Arc<SqliteInventoryStore>;
    type Directory = Arc<SqliteDirectory>;
    type Requests = Arc<SqliteRequestTracker>;
    type Notifier = QueueDispatcher;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = repairdesk_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
        max_connections: config.database.max_connections,
    }
    .build()
    .await
    .context("opening database")?;
    let pool = db.pool().clone();

    // Repositories
    let services = Arc::new(SqliteServiceRepository::new(pool.clone()));
    let removed_parts = Arc::new(SqliteRemovedPartRepository::new(pool.clone()));
    let inventory = Arc::new(SqliteInventoryStore::new(pool.clone()));
    let directory = Arc::new(SqliteDirectory::new(pool.clone()));
    let requests = Arc::new(SqliteRequestTracker::new(pool));

    ensure_admin(&directory, &config.bootstrap.admin_name).await?;

    // Notifications
    let (notifier, receiver) = QueueDispatcher::new(config.notifications.queue_capacity);
    let worker = NotificationWorker::start(receiver, TracingTransport);

    // Use-cases
    let lifecycle = ServiceLifecycle::new(
        Arc::clone(&services),
        removed_parts,
        Arc::clone(&directory),
        requests,
        notifier.clone(),
    )
    .with_request_window(config.request_window());
    let coordinator = AllocationCoordinator::new(
        Arc::clone(&inventory),
        services,
        Arc::clone(&directory),
        notifier,
    );
    let parts = PartsInventory::new(inventory, directory);

    // HTTP
    let state = AppState::<SqlitePorts>::new(lifecycle, coordinator, parts);
    let app = repairdesk_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(%bind_addr, "repairdeskd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    worker.stop().await;
    tracing::info!("repairdeskd stopped");
    Ok(())
}

/// Create the bootstrap admin unless an admin already exists.
async fn ensure_admin<D: Directory>(directory: &D, name: &str) -> anyhow::Result<()> {
    let admins = directory
        .find_users_by_role(Role::Admin)
        .await
        .context("looking up admin users")?;
    if let Some(admin) = admins.first() {
        tracing::debug!(admin_id = %admin.id, "admin user present");
        return Ok(());
    }
    let admin = directory
        .create_user(User::new(name, Role::Admin)?)
        .await
        .context("creating bootstrap admin")?;
    tracing::info!(admin_id = %admin.id, name = %admin.name, "created bootstrap admin");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutdown requested");
}
