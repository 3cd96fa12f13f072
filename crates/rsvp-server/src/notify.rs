//! Routes confirmations to the registrant's chosen channel.

use crate::attendee::ContactMethod;
use crate::config::{EmailConfig, NotificationConfig, WhatsAppConfig};
use notification_client::{Delivery, EmailAddress, EmailClient, NotificationError, WhatsAppClient};
use tracing::{info, instrument};

/// Confirmation email body.
pub const CONFIRMATION_TEMPLATE: &str = include_str!("../templates/confirmation.html");

/// Sends one confirmation per successful registration.
#[derive(Clone)]
pub struct Notifier {
    email: EmailClient,
    subject: String,
    whatsapp: WhatsAppClient,
    template_name: String,
    language_code: String,
}

impl Notifier {
    /// Build both provider clients from configuration.
    pub fn new(
        email: &EmailConfig,
        whatsapp: &WhatsAppConfig,
        notification: &NotificationConfig,
    ) -> Result<Self, NotificationError> {
        let email_client = EmailClient::new(
            email.api_key.clone(),
            email.base_url.clone(),
            EmailAddress::new(email.sender_email.clone(), email.sender_name.clone()),
            notification.timeout,
        )?;

        let whatsapp_client = WhatsAppClient::new(
            whatsapp.access_token.clone(),
            whatsapp.phone_number_id.clone(),
            whatsapp.base_url.clone(),
            whatsapp.api_version.clone(),
            notification.timeout,
        )?;

        Ok(Self {
            email: email_client,
            subject: email.subject.clone(),
            whatsapp: whatsapp_client,
            template_name: whatsapp.template_name.clone(),
            language_code: whatsapp.language_code.clone(),
        })
    }

    /// Send the confirmation through `method` to `contact_info`.
    #[instrument(skip(self, contact_info))]
    pub async fn notify(
        &self,
        method: ContactMethod,
        contact_info: &str,
    ) -> Result<Delivery, NotificationError> {
        let delivery = match method {
            ContactMethod::Email => {
                self.email
                    .send(contact_info, &self.subject, CONFIRMATION_TEMPLATE)
                    .await?
            }
            ContactMethod::Whatsapp => {
                self.whatsapp
                    .send_template(contact_info, &self.template_name, &self.language_code)
                    .await?
            }
        };

        info!(message_id = ?delivery.message_id, "Confirmation sent");
        Ok(delivery)
    }
}
