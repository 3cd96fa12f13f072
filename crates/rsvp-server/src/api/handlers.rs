//! HTTP request handlers.

use super::types::{
    HealthResponse, VerificationQuery, VerificationResponse, REGISTRATION_SUCCESS_MESSAGE,
};
use super::AppState;
use crate::attendee::{validate, FieldError, RegistrationPayload};
use crate::error::{MessageResponse, RsvpError, StoreError};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info, warn};

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.store.ping().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        database,
    })
}

/// Log an infrastructure failure with its detail, then hand back the opaque error.
fn store_failure(stage: &'static str, e: StoreError) -> RsvpError {
    if !matches!(e, StoreError::Duplicate(_)) {
        error!(stage, error = %e, "Attendee store failure");
    }
    RsvpError::from(e)
}

/// Register attendance: validate, reject duplicates, persist, then confirm.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), RsvpError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Unreadable registration body");
        RsvpError::Validation(vec![FieldError::new("body", rejection.body_text())])
    })?;

    let record = validate(&payload).map_err(|errors| {
        info!(error_count = errors.len(), "Registration rejected by validation");
        RsvpError::Validation(errors)
    })?;
    let contact_method = record.contact_method;

    if state
        .store
        .find_by_contact(&record.contact_info)
        .await
        .map_err(|e| store_failure("duplicate_check", e))?
        .is_some()
    {
        info!(%contact_method, "Registration rejected: contact already registered");
        return Err(RsvpError::AlreadyRegistered);
    }

    // A concurrent registration may still win between the lookup and here;
    // the store reports that as a duplicate.
    let attendee = state
        .store
        .insert(record)
        .await
        .map_err(|e| store_failure("persist", e))?;

    info!(attendee_id = attendee.id, %contact_method, guests = attendee.guests, "Attendee registered");

    // The row stays persisted when the confirmation fails.
    if let Err(e) = state
        .notifier
        .notify(contact_method, &attendee.contact_info)
        .await
    {
        error!(
            attendee_id = attendee.id,
            %contact_method,
            error = %e,
            "Attendee persisted but confirmation could not be sent"
        );
        return Err(RsvpError::Notification(e));
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: REGISTRATION_SUCCESS_MESSAGE.to_string(),
        }),
    ))
}

/// Report whether a contact is already registered.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerificationQuery>,
) -> Result<Json<VerificationResponse>, RsvpError> {
    let contact_info = query
        .contact_info
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            RsvpError::Validation(vec![FieldError::new("contactInfo", "contactInfo is required")])
        })?;

    let registered = state
        .store
        .find_by_contact(contact_info)
        .await
        .map_err(|e| store_failure("verification", e))?
        .is_some();

    Ok(Json(VerificationResponse { registered }))
}
