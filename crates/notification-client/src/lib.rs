//! Outbound notification providers: Brevo transactional email and the
//! WhatsApp Cloud API.

mod email;
mod error;
mod types;
mod whatsapp;

pub use email::{EmailClient, DEFAULT_BREVO_URL};
pub use error::NotificationError;
pub use types::*;
pub use whatsapp::{WhatsAppClient, DEFAULT_API_VERSION, DEFAULT_GRAPH_URL};
