use std::sync::Arc;
use std::time::Duration;

use rowdesk_engine::postgres::PgBackend;
use rowdesk_engine::{Collaborators, EngineConfig, ReassignmentSweeper, RuleEngine};
use rowdesk_events::{EventBus, EventPersistence};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rowdesk_worker=debug,rowdesk_engine=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = EngineConfig::from_env();
    tracing::info!(
        lookup_timeout_ms = config.lookup_timeout.as_millis() as u64,
        lookup_concurrency = config.lookup_concurrency,
        commit_retry_limit = config.commit_retry_limit,
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "Loaded engine configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = rowdesk_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    rowdesk_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    rowdesk_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let persistence_handle =
        tokio::spawn(EventPersistence::run(pool.clone(), event_bus.subscribe()));

    // --- Engine ---
    let collaborators = Collaborators::shared(Arc::new(PgBackend::new(pool)));
    let engine = Arc::new(
        RuleEngine::new(collaborators.clone(), config).with_events(event_bus.clone()),
    );
    let sweeper = ReassignmentSweeper::new(engine.clone(), &collaborators);

    let cancel = CancellationToken::new();
    let sweeper_cancel = cancel.clone();
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run(sweeper_cancel).await;
    });

    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(10), sweeper_handle).await;
    tracing::info!("Reassignment sweeper stopped");

    // The engine holds a bus sender too; both must go before persistence drains.
    drop(engine);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    tracing::info!("Worker shut down");
}

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
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
