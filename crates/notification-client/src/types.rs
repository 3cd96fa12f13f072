//! Provider request and response types.

use serde::{Deserialize, Serialize};

/// Named email address, as Brevo expects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    pub email: String,
    pub name: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Brevo `POST /v3/smtp/email` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub sender: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub subject: String,
    pub html_content: String,
}

/// Brevo acceptance reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    #[serde(default)]
    pub message_id: Option<String>,
}

/// WhatsApp Cloud API template message.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateMessageRequest {
    pub messaging_product: &'static str,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub template: Template,
}

impl TemplateMessageRequest {
    pub fn new(to: impl Into<String>, template: Template) -> Self {
        Self {
            messaging_product: "whatsapp",
            to: to.into(),
            kind: "template",
            template,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub name: String,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize)]
pub struct Language {
    pub code: String,
}

/// WhatsApp Cloud API acceptance reply.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateMessageResponse {
    #[serde(default)]
    pub messages: Vec<MessageId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageId {
    pub id: String,
}

/// Identifier assigned by a provider to an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: Option<String>,
}
