//! API request and response types.

use serde::{Deserialize, Serialize};

/// Message returned after a successful registration.
pub const REGISTRATION_SUCCESS_MESSAGE: &str = "registration successful";

/// Query string of `GET /api/verification`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationQuery {
    pub contact_info: Option<String>,
}

/// Whether a contact already has a registration.
#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub registered: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
}
