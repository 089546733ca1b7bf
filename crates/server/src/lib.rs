//! Ticketdesk server library.
//!
//! Authentication and role authorization for the ticket-tracking backend,
//! plus the user, role and ticket administration endpoints it guards. The
//! binary in `main.rs` only wires configuration, logging and a store into
//! [`app`]; tests drive the same router in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    http::{HeaderValue, Request, Response, header::CONTENT_TYPE},
};
use tower_cookies::CookieManagerLayer;
use tower_http::cors::{AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::ServerConfig;
use crate::middleware::{PolicyError, request_id_middleware};
use crate::state::AppState;

/// Build the complete application router with its middleware stack.
///
/// # Errors
///
/// Returns `PolicyError::Unknown` if a route requires a policy missing from
/// the state's policy table.
pub fn app(state: AppState) -> Result<Router, PolicyError> {
    let cors = cors_layer(state.config());

    let router = routes::routes(&state)?
        .layer(CookieManagerLayer::new())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state);

    Ok(router)
}

/// Credentialed CORS for the configured browser origins.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|url| HeaderValue::from_str(&url.origin().ascii_serialization()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}
