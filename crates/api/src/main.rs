use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use learnhub_api::config::ServerConfig;
use learnhub_api::notifications::NotificationRouter;
use learnhub_api::router::build_app_router;
use learnhub_api::site::SiteConfig;
use learnhub_api::state::AppState;
use learnhub_api::ws;
use learnhub_events::{
    EmailConfig, EmailDelivery, EventBus, MailDispatcher, RecountConfig, RecountQueue,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // LOG_FORMAT=json switches to one JSON object per line.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "learnhub_api=debug,learnhub_events=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let site = Arc::new(SiteConfig::from_env().expect("Failed to load site configuration"));
    tracing::info!(site_name = %site.site_name, base_url = %site.base_url, "Loaded site configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = learnhub_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    learnhub_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    learnhub_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- Mail ---
    let delivery = match EmailConfig::from_env() {
        Some(email_config) => match EmailDelivery::from_config(email_config) {
            Ok(delivery) => {
                tracing::info!("Email delivery enabled");
                Some(Arc::new(delivery))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Email delivery disabled: failed to load templates");
                None
            }
        },
        None => {
            tracing::info!("SMTP_HOST not set, email delivery disabled");
            None
        }
    };
    let mailer = MailDispatcher::new(pool.clone(), delivery);

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    let notification_router = NotificationRouter::new(
        pool.clone(),
        Arc::clone(&ws_manager),
        mailer.clone(),
        Arc::clone(&site),
    );
    let router_handle = tokio::spawn(notification_router.run(event_bus.subscribe()));

    // --- Recount worker ---
    let recount_config =
        RecountConfig::default().with_settle_delay(Duration::from_millis(config.recount_settle_ms));
    let (recount, recount_worker) = RecountQueue::new(pool.clone(), recount_config);
    let recount_cancel = CancellationToken::new();
    let recount_handle = tokio::spawn(recount_worker.run(recount_cancel.clone()));

    tracing::info!("Background services started (notification router, recount worker)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        site,
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
        recount,
        mailer,
    };

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
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    recount_cancel.cancel();
    match tokio::time::timeout(grace, recount_handle).await {
        Ok(Ok(stats)) => tracing::info!(
            completed = stats.completed,
            abandoned = stats.abandoned,
            coalesced = stats.coalesced,
            "Recount worker stopped"
        ),
        Ok(Err(e)) => tracing::error!(error = %e, "Recount worker panicked"),
        Err(_) => tracing::warn!("Recount worker did not stop in time"),
    }

    // Dropping the last bus handle closes the channel and ends the router.
    drop(event_bus);
    let _ = tokio::time::timeout(grace, router_handle).await;
    tracing::info!("Notification router shut down");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or, on Unix, SIGTERM.
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
