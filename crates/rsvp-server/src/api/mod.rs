//! HTTP API for the RSVP server.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{
    cors_layer, forwarded_client, logging_middleware, origin_allowed, rate_limit_middleware,
    registration_rate_limit_middleware, RateLimitState,
};
pub use types::*;

use crate::attendee::AttendeeStore;
use crate::config::Environment;
use crate::notify::Notifier;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 16 * 1024;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline'; img-src 'self' data: https://maps.gstatic.com";

const STRICT_TRANSPORT_SECURITY: &str = "max-age=63072000; includeSubDomains; preload";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Attendee table
    pub store: Arc<AttendeeStore>,
    /// Confirmation sender
    pub notifier: Arc<Notifier>,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: AttendeeStore, notifier: Notifier) -> Self {
        Self {
            store: Arc::new(store),
            notifier: Arc::new(notifier),
        }
    }
}

/// Create the API router.
pub fn create_router(
    state: AppState,
    rate_limit: RateLimitState,
    environment: Environment,
) -> Router {
    let registration = Router::new()
        .route("/api/registration", post(handlers::register))
        .route_layer(axum_middleware::from_fn_with_state(
            rate_limit.clone(),
            registration_rate_limit_middleware,
        ));

    let api = Router::new()
        .route("/api/verification", get(handlers::verify))
        .merge(registration)
        .route_layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    let router = Router::new()
        // Health check (no rate limiting)
        .route("/health", get(handlers::health))
        .merge(api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(environment))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ));

    let router = if environment.is_production() {
        router.layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
        ))
    } else {
        router
    };

    router
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
