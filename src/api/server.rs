use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    address_search, admin_access_requests, admin_dataset, admin_query_log, admin_reload_dataset,
    export, filter_options, health_check, login, logout, query, submit_access_request, AppState,
};
use crate::auth::{CredentialStore, SessionStore, SessionSweeper};
use crate::config::ServerConfig;
use crate::data::{ColumnMapping, DatasetCache, DatasetLoader};
use crate::journal::{AccessLog, AccessRequests};

/// How often expired sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Sessions
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/access-requests", post(submit_access_request))
        // Data operations
        .route("/filters", get(filter_options))
        .route("/addresses", get(address_search))
        .route("/query", post(query))
        .route("/export", post(export))
        // Administration
        .route("/admin/access-requests", get(admin_access_requests))
        .route("/admin/query-log", get(admin_query_log))
        .route("/admin/dataset", get(admin_dataset))
        .route("/admin/dataset/reload", post(admin_reload_dataset))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mapping = match &config.column_map {
        Some(path) => ColumnMapping::builtin_with_file(path)?,
        None => ColumnMapping::builtin(),
    };
    tracing::info!("Column mapping has {} renames", mapping.len());

    let loader = DatasetLoader::new(config.data_source.clone(), mapping)?;
    let datasets = DatasetCache::new(loader, config.cache_ttl);

    // No users table means nobody can log in
    let credentials = CredentialStore::load(&config.users_path)?;

    // Warm the cache; a failed first load is retried on the next request
    match datasets.get().await {
        Ok(loaded) => tracing::info!(
            rows = loaded.dataset.len(),
            skipped = loaded.skipped_rows,
            "Dataset ready"
        ),
        Err(e) => tracing::warn!("Initial dataset load failed: {}", e),
    }

    let sessions = Arc::new(SessionStore::new(config.session_ttl));

    let state = Arc::new(AppState {
        datasets,
        credentials,
        sessions: Arc::clone(&sessions),
        access_log: AccessLog::new(&config.log_path),
        access_requests: AccessRequests::new(&config.pending_path),
        max_address_matches: config.max_address_matches,
    });

    // Start background workers
    let sweeper = Arc::new(SessionSweeper::new(sessions, SESSION_SWEEP_INTERVAL));
    let sweeper_handle = Arc::clone(&sweeper).start();

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting cadastre server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(Arc::clone(&sweeper)))
    .await?;

    sweeper_handle.abort();

    tracing::info!("Cadastre server stopped");
    Ok(())
}

async fn shutdown_signal(sweeper: Arc<SessionSweeper>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, stopping workers...");
    sweeper.stop();
}
