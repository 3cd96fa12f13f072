//! Attendee records, the contact validator, and the attendee store.

mod store;
mod validate;

pub use store::{AttendeeStore, MemoryStore, MySqlStore};
pub use validate::{escape_html, is_email, is_mx_mobile, validate, FieldError, RegistrationPayload};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Channel a registrant wants their confirmation on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Email,
    Whatsapp,
}

impl ContactMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactMethod::Email => "email",
            ContactMethod::Whatsapp => "whatsapp",
        }
    }
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ContactMethod::Email),
            "whatsapp" => Ok(ContactMethod::Whatsapp),
            other => Err(format!("unknown contact method: {}", other)),
        }
    }
}

/// A validated registration, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendee {
    /// Trimmed and HTML-escaped
    pub full_name: String,
    pub contact_method: ContactMethod,
    /// Trimmed; unique across attendees
    pub contact_info: String,
    pub guests: u8,
}

/// A persisted registration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: u64,
    pub full_name: String,
    pub contact_method: ContactMethod,
    pub contact_info: String,
    pub guests: u8,
    pub created_at: DateTime<Utc>,
}

impl Attendee {
    /// Build the stored row for `record` under the given id.
    pub fn from_new(id: u64, record: NewAttendee, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            full_name: record.full_name,
            contact_method: record.contact_method,
            contact_info: record.contact_info,
            guests: record.guests,
            created_at,
        }
    }
}
