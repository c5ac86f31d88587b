use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use propdesk_events::{EventBus, NotificationRouter};
use propdesk_storage::local::LocalStorage;
use propdesk_storage::s3::S3Storage;
use propdesk_storage::{FallbackStorage, StorageProvider};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use propdesk_api::ai::AnthropicClient;
use propdesk_api::background::housekeeping;
use propdesk_api::config::{ServerConfig, DEFAULT_LOG_FILTER};
use propdesk_api::middleware::rate_limit::RateLimiter;
use propdesk_api::router::{build_app_router, LOCAL_UPLOADS_PATH};
use propdesk_api::state::AppState;

const EVENT_BUS_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = propdesk_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    propdesk_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    propdesk_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Storage ---
    let local = LocalStorage::new(&config.storage.upload_dir, LOCAL_UPLOADS_PATH);
    let cloud: Option<Arc<dyn StorageProvider>> = match config.storage.s3_bucket.clone() {
        Some(bucket) => {
            let s3 = S3Storage::connect(
                bucket,
                config.storage.s3_endpoint.clone(),
                config.storage.s3_public_base_url.clone(),
            )
            .await;
            tracing::info!(bucket = s3.bucket(), "Cloud storage enabled with local fallback");
            Some(Arc::new(s3))
        }
        None => {
            tracing::info!(
                upload_dir = %config.storage.upload_dir.display(),
                "S3_BUCKET not set, uploads are stored locally"
            );
            None
        }
    };
    let storage = Arc::new(FallbackStorage::new(cloud, local));

    // --- Rate limiting ---
    let rate_limiter = Arc::new(RateLimiter::connect(config.rate_limit.clone()).await);

    // --- AI ---
    let ai = AnthropicClient::from_config(&config.ai).map(Arc::new);
    match &ai {
        Some(client) => tracing::info!(model = client.model(), "AI content generation enabled"),
        None => tracing::info!("ANTHROPIC_API_KEY not set, AI content generation disabled"),
    }

    // --- Event bus and notifications ---
    let event_bus = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));
    let router_handle = tokio::spawn(
        NotificationRouter::new(pool.clone()).run(event_bus.subscribe()),
    );

    // --- Housekeeping ---
    let housekeeping_cancel = CancellationToken::new();
    let housekeeping_handle = tokio::spawn(housekeeping::run(
        pool.clone(),
        config.housekeeping.clone(),
        housekeeping_cancel.clone(),
    ));

    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config),
        event_bus: Arc::clone(&event_bus),
        storage,
        rate_limiter,
        ai,
    };
    let app = build_app_router(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    housekeeping_cancel.cancel();
    let _ = tokio::time::timeout(shutdown_timeout, housekeeping_handle).await;
    tracing::info!("Housekeeping stopped");

    // Dropping the last sender closes the channel and ends the router loop.
    drop(event_bus);
    let _ = tokio::time::timeout(shutdown_timeout, router_handle).await;
    tracing::info!("Notification router stopped");

    pool.close().await;
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
