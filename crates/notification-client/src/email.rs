//! Brevo transactional email client.

use crate::error::NotificationError;
use crate::types::{Delivery, EmailAddress, SendEmailRequest, SendEmailResponse};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default Brevo API endpoint.
pub const DEFAULT_BREVO_URL: &str = "https://api.brevo.com";

/// Display name used for every recipient.
const RECIPIENT_NAME: &str = "Recipient";

/// Client for Brevo's transactional email API.
///
/// The API key is held as a `SecretString` so it never shows up in
/// `Debug` output or logs.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    sender: EmailAddress,
}

impl EmailClient {
    /// Create a new email client.
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        sender: EmailAddress,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            sender,
        })
    }

    /// Send one HTML email. Succeeds only once Brevo has accepted it.
    #[instrument(skip(self, to, html_content))]
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<Delivery, NotificationError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(NotificationError::NotConfigured("email api key"));
        }

        let request = SendEmailRequest {
            sender: self.sender.clone(),
            to: vec![EmailAddress::new(to, RECIPIENT_NAME)],
            subject: subject.to_string(),
            html_content: html_content.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/v3/smtp/email", self.base_url))
            .header("api-key", self.api_key.expose_secret())
            .header("accept", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = NotificationError::from_response(response).await;
            warn!(error = %err, "Email send rejected");
            return Err(err);
        }

        // Brevo answers 201 with a messageId; an empty body still counts as accepted.
        let body = response.text().await?;
        let message_id = if body.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<SendEmailResponse>(&body)?.message_id
        };

        debug!(message_id = ?message_id, "Email accepted");
        Ok(Delivery { message_id })
    }
}
