//! RSVP server - Entry point.

use rsvp_server::{
    api::{create_router, AppState, RateLimitState},
    config::{Config, LogFormat},
    AttendeeStore, Notifier,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    let environment = config.server.environment;
    info!(environment = environment.as_str(), "Starting RSVP server");

    // Initialize storage
    let store = match AttendeeStore::mysql(&config.database).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to connect to attendee database: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize notification providers
    let notifier = match Notifier::new(&config.email, &config.whatsapp, &config.notification) {
        Ok(n) => n,
        Err(e) => {
            error!("Failed to create notification clients: {}", e);
            std::process::exit(1);
        }
    };

    // Create application state
    let state = AppState::new(store, notifier);

    // Create rate limiter from config
    let rate_limit = RateLimitState::new(&config.rate_limit, config.server.trust_proxy);

    // Create router with rate limiting
    let app = create_router(state, rate_limit, environment);

    // Bind to address
    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
