//! WhatsApp Cloud API client for template messages.

use crate::error::NotificationError;
use crate::types::{Delivery, Language, Template, TemplateMessageRequest, TemplateMessageResponse};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// Default Graph API endpoint.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

/// Graph API version the message endpoint is called with.
pub const DEFAULT_API_VERSION: &str = "v21.0";

/// Client for sending pre-approved template messages through WhatsApp.
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    base_url: String,
    api_version: String,
    access_token: SecretString,
    phone_number_id: String,
}

impl WhatsAppClient {
    /// Create a new WhatsApp client.
    pub fn new(
        access_token: SecretString,
        phone_number_id: impl Into<String>,
        base_url: impl Into<String>,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            access_token,
            phone_number_id: phone_number_id.into(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url,
            self.api_version,
            encode(&self.phone_number_id)
        )
    }

    /// Send a template message to `to` (digits with country code, e.g. `5215512345678`).
    #[instrument(skip(self, to))]
    pub async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        language_code: &str,
    ) -> Result<Delivery, NotificationError> {
        if self.access_token.expose_secret().is_empty() {
            return Err(NotificationError::NotConfigured("whatsapp access token"));
        }
        if self.phone_number_id.is_empty() {
            return Err(NotificationError::NotConfigured("whatsapp phone number id"));
        }

        let request = TemplateMessageRequest::new(
            to,
            Template {
                name: template_name.to_string(),
                language: Language {
                    code: language_code.to_string(),
                },
            },
        );

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(self.access_token.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = NotificationError::from_response(response).await;
            warn!(error = %err, "WhatsApp send rejected");
            return Err(err);
        }

        // A 2xx means the message was accepted, even without a readable body.
        let body = response.text().await?;
        let message_id = serde_json::from_str::<TemplateMessageResponse>(&body)
            .ok()
            .and_then(|reply| reply.messages.into_iter().next())
            .map(|m| m.id);

        debug!(message_id = ?message_id, "WhatsApp message accepted");
        Ok(Delivery { message_id })
    }
}
