//! Notification provider errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Provider rate limit exceeded")]
    RateLimit,

    /// Any other non-success reply. `body` is the provider's diagnostic payload.
    #[error("Provider error: {status} - {body}")]
    Provider { status: u16, body: String },

    #[error("Provider not configured: {0}")]
    NotConfigured(&'static str),
}

impl NotificationError {
    /// Build an error from a non-success provider response.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => NotificationError::Unauthorized(body),
            429 => NotificationError::RateLimit,
            code => NotificationError::Provider { status: code, body },
        }
    }
}
