use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use troth_api::config::{ServerConfig, StoreBackend};
use troth_api::router::build_app_router;
use troth_api::state::{seed_users, AppState};
use troth_core::matching::{InMemoryMatchStore, MatchStore, SubscriptionExpiry};
use troth_events::{EventBus, NoticeLog};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "troth_api=debug,troth_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Match store ---
    let (store, pool) = match &config.store {
        StoreBackend::Postgres { database_url } => {
            let pool = troth_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            troth_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            troth_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store: Arc<dyn MatchStore> = Arc::new(troth_db::PgMatchStore::new(pool.clone()));
            (store, Some(pool))
        }
        StoreBackend::Memory { seed_users: names } => {
            tracing::warn!("Using the in-memory match store; state is lost on restart");
            let memory = InMemoryMatchStore::new();
            for user in seed_users(&memory, names).await {
                tracing::info!(user_id = user.id, name = %user.name, "Seeded user");
            }
            if names.is_empty() {
                tracing::warn!("MEMORY_SEED_USERS is empty; every matching call will 404");
            }
            let store: Arc<dyn MatchStore> = Arc::new(memory);
            (store, None)
        }
    };

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let notice_log_handle = tokio::spawn(NoticeLog::run(event_bus.subscribe()));
    tracing::info!("Event bus and notice log started");

    // --- App state ---
    let config = Arc::new(config);
    let state = AppState::new(
        Arc::clone(&config),
        store,
        Arc::new(SubscriptionExpiry),
        Arc::clone(&event_bus),
        pool,
    );
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // The router owned the other bus handles; dropping the last one closes
    // the channel and lets the notice log drain.
    drop(event_bus);
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(drain, notice_log_handle).await {
        Ok(Ok(delivered)) => tracing::info!(delivered, "Notice log drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Notice log task failed"),
        Err(_) => tracing::warn!("Notice log did not drain before the shutdown timeout"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
