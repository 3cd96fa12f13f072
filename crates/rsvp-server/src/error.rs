//! Error types for the RSVP server.

use crate::attendee::FieldError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use notification_client::NotificationError;
use serde::Serialize;
use thiserror::Error;

/// Message returned for every infrastructure failure. Details stay in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Message returned when the contact is already registered.
pub const ALREADY_REGISTERED_MESSAGE: &str = "already registered";

/// Attendee store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Contact already registered: {0}")]
    Duplicate(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Database error: {0}")]
    Database(String),
}

/// Plain conversion. A pool timeout only means saturation when the pool is
/// full, which the store decides before falling back to this.
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Request-level error taxonomy.
#[derive(Debug, Error)]
pub enum RsvpError {
    #[error("Validation failed ({} field errors)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Contact already registered")]
    AlreadyRegistered,

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded(&'static str),
}

impl From<StoreError> for RsvpError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => RsvpError::AlreadyRegistered,
            other => RsvpError::Store(other),
        }
    }
}

/// `{ "message": ... }` response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `{ "errors": [...] }` response body.
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub errors: Vec<FieldError>,
}

fn message(status: StatusCode, text: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            message: text.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for RsvpError {
    fn into_response(self) -> Response {
        match self {
            RsvpError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(ValidationResponse { errors })).into_response()
            }
            RsvpError::AlreadyRegistered => {
                message(StatusCode::CONFLICT, ALREADY_REGISTERED_MESSAGE)
            }
            RsvpError::Store(StoreError::PoolExhausted) => {
                let mut response =
                    message(StatusCode::SERVICE_UNAVAILABLE, INTERNAL_ERROR_MESSAGE);
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, header::HeaderValue::from_static("5"));
                response
            }
            RsvpError::RateLimitExceeded(text) => message(StatusCode::TOO_MANY_REQUESTS, text),
            RsvpError::Store(_) | RsvpError::Notification(_) => {
                message(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}
