//! Ticketdesk server - ticket-tracking HTTP backend.
//!
//! # Architecture
//!
//! - Axum web framework serving a JSON API under `/api/v1`
//! - Stateless sessions: claims sealed into an encrypted cookie at login
//! - Named role policies checked per route group, every denial a bare 401
//! - `PostgreSQL` identity and ticket store, or an in-process store for
//!   `memory://` URLs
//!
//! Migrations are NOT run on startup. Run them via `td-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketdesk_server::config::{LogFormat, ServerConfig};
use ticketdesk_server::db::{self, IdentityStore, MemoryStore, PgStore, TicketStore};
use ticketdesk_server::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ticketdesk_server=info,tower_http=debug".into());

    let json = config.log_format == LogFormat::Json;
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let (identity, tickets): (Arc<dyn IdentityStore>, Arc<dyn TicketStore>) =
        if config.uses_memory_store() {
            tracing::warn!("Using in-memory store; all data is lost on shutdown");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn IdentityStore>, store as Arc<dyn TicketStore>)
        } else {
            let pool = db::create_pool(&config.database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            let store = Arc::new(PgStore::new(pool));
            (store.clone() as Arc<dyn IdentityStore>, store as Arc<dyn TicketStore>)
        };

    let state = AppState::new(config.clone(), identity, tickets)
        .expect("Failed to initialize application state");

    let app = ticketdesk_server::app(state)
        .expect("Failed to build router")
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!(
        registration = ?config.registration,
        "ticketdesk listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
