//! Rate limiting, CORS, and other middleware.

use crate::config::{Environment, RateLimitConfig};
use crate::error::RsvpError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, warn};

/// Per-caller rate limiter keyed by IP address.
pub type KeyedLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

const API_LIMIT_MESSAGE: &str = "request limit exceeded";
const REGISTRATION_LIMIT_MESSAGE: &str = "too many registrations from this address";

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    /// Applies to every API route
    pub api: Arc<KeyedLimiter>,
    /// Applies to the registration route only
    pub registration: Arc<KeyedLimiter>,
    /// Read the caller from `X-Forwarded-For`
    pub trust_proxy: bool,
}

/// Quota allowing `max` requests per `window`, refilled evenly.
fn quota(max: u32, window: Duration) -> Quota {
    let max = NonZeroU32::new(max).unwrap_or(NonZeroU32::MIN);
    let period = window / max.get();

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(max))
        .allow_burst(max)
}

impl RateLimitState {
    /// Create rate limit state from configuration.
    pub fn new(config: &RateLimitConfig, trust_proxy: bool) -> Self {
        Self {
            api: Arc::new(RateLimiter::keyed(quota(config.api_max, config.api_window))),
            registration: Arc::new(RateLimiter::keyed(quota(
                config.registration_max,
                config.registration_window,
            ))),
            trust_proxy,
        }
    }

    /// Create a permissive rate limiter for testing.
    pub fn permissive() -> Self {
        let generous = RateLimitConfig {
            api_max: 10_000,
            api_window: Duration::from_secs(1),
            registration_max: 10_000,
            registration_window: Duration::from_secs(1),
        };
        Self::new(&generous, true)
    }

    fn caller(&self, request: &Request) -> IpAddr {
        let socket = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let forwarded = if self.trust_proxy {
            forwarded_client(request.headers())
        } else {
            None
        };

        forwarded
            .or(socket)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

/// Client address as seen by the one trusted proxy: the last `X-Forwarded-For` entry.
pub fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .last()
        .and_then(|hop| hop.trim().parse().ok())
}

/// API-wide rate limiting middleware.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RsvpError> {
    let caller = rate_limit.caller(&request);
    if rate_limit.api.check_key(&caller).is_err() {
        warn!(%caller, "API rate limit exceeded");
        return Err(RsvpError::RateLimitExceeded(API_LIMIT_MESSAGE));
    }

    debug!(%caller, "Rate limit check passed");
    Ok(next.run(request).await)
}

/// Registration rate limiting middleware.
pub async fn registration_rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RsvpError> {
    let caller = rate_limit.caller(&request);
    if rate_limit.registration.check_key(&caller).is_err() {
        warn!(%caller, "Registration rate limit exceeded");
        return Err(RsvpError::RateLimitExceeded(REGISTRATION_LIMIT_MESSAGE));
    }

    Ok(next.run(request).await)
}

/// Logging middleware for requests.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    debug!(%method, %uri, "Request started");

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_success() {
        debug!(%method, %uri, %status, ?duration, "Request completed");
    } else {
        warn!(%method, %uri, %status, ?duration, "Request failed");
    }

    response
}

const ALLOWED_ORIGIN_SUFFIXES: [&str; 2] = [".vercel.app", ".onrender.com"];
const DEVELOPMENT_ORIGIN: &str = "http://localhost:3000";

/// Whether a browser origin may call the API.
pub fn origin_allowed(origin: &str, environment: Environment) -> bool {
    if environment == Environment::Development && origin == DEVELOPMENT_ORIGIN {
        return true;
    }

    let Some(host) = origin.strip_prefix("https://") else {
        return false;
    };

    ALLOWED_ORIGIN_SUFFIXES.iter().any(|suffix| {
        host.strip_suffix(suffix)
            .is_some_and(|sub| !sub.is_empty() && !sub.contains(['/', ':', '@']))
    })
}

/// CORS policy: allow-listed origins, GET and POST, JSON bodies.
pub fn cors_layer(environment: Environment) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                let allowed = origin
                    .to_str()
                    .map(|o| origin_allowed(o, environment))
                    .unwrap_or(false);
                if !allowed {
                    warn!(origin = ?origin, "Blocked by CORS");
                }
                allowed
            },
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
