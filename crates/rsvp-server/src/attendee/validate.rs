//! Contact validator.
//!
//! Turns a loosely-typed registration payload into a [`NewAttendee`], or
//! reports every field problem at once. Never fails on payload shape.

use super::{ContactMethod, NewAttendee};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Maximum length of the escaped full name, in characters.
pub const MAX_FULL_NAME_LEN: usize = 100;

/// Maximum number of accompanying guests.
pub const MAX_GUESTS: i64 = 10;

const MAX_EMAIL_LEN: usize = 254;
const MAX_EMAIL_LOCAL_LEN: usize = 64;
const MAX_EMAIL_DOMAIN_LEN: usize = 253;

static EMAIL_LOCAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*$")
        .expect("valid email local-part pattern")
});

static EMAIL_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
        .expect("valid email domain pattern")
});

// Mexican mobile numbers: optional +52 country code, optional legacy 1/01
// mobile prefix, then 10 or 11 digits.
static MX_MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?52)?(1|01)?\d{10,11}$").expect("valid phone pattern")
});

/// Raw registration body. Every field is optional and untyped so that
/// shape problems surface as field errors instead of extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub full_name: Option<Value>,
    pub contact_method: Option<Value>,
    pub contact_info: Option<Value>,
    pub guests: Option<Value>,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate and normalize a registration.
pub fn validate(payload: &RegistrationPayload) -> Result<NewAttendee, Vec<FieldError>> {
    let mut errors = Vec::new();

    let full_name = check_full_name(payload.full_name.as_ref(), &mut errors);
    let contact_method = check_contact_method(payload.contact_method.as_ref(), &mut errors);
    let contact_info =
        check_contact_info(payload.contact_info.as_ref(), contact_method, &mut errors);
    let guests = check_guests(payload.guests.as_ref(), &mut errors);

    match (full_name, contact_method, contact_info, guests) {
        (Some(full_name), Some(contact_method), Some(contact_info), Some(guests))
            if errors.is_empty() =>
        {
            Ok(NewAttendee {
                full_name,
                contact_method,
                contact_info,
                guests,
            })
        }
        _ => Err(errors),
    }
}

fn check_full_name(value: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<String> {
    let Some(raw) = value.and_then(Value::as_str) else {
        errors.push(FieldError::new("fullName", "fullName is required"));
        return None;
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new("fullName", "fullName is required"));
        return None;
    }

    let escaped = escape_html(trimmed);
    if escaped.chars().count() > MAX_FULL_NAME_LEN {
        errors.push(FieldError::new(
            "fullName",
            format!("fullName must be at most {} characters", MAX_FULL_NAME_LEN),
        ));
        return None;
    }

    Some(escaped)
}

fn check_contact_method(
    value: Option<&Value>,
    errors: &mut Vec<FieldError>,
) -> Option<ContactMethod> {
    match value.and_then(Value::as_str).map(str::parse::<ContactMethod>) {
        Some(Ok(method)) => Some(method),
        _ => {
            errors.push(FieldError::new(
                "contactMethod",
                "contactMethod must be one of: email, whatsapp",
            ));
            None
        }
    }
}

fn check_contact_info(
    value: Option<&Value>,
    method: Option<ContactMethod>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let info = value.and_then(Value::as_str).map(str::trim).unwrap_or("");
    if info.is_empty() {
        errors.push(FieldError::new("contactInfo", "contactInfo is required"));
        return None;
    }

    // Without a usable method the format cannot be judged; the method error covers it.
    match method? {
        ContactMethod::Email if !is_email(info) => {
            errors.push(FieldError::new("contactInfo", "invalid email address"));
            None
        }
        ContactMethod::Whatsapp if !is_mx_mobile(info) => {
            errors.push(FieldError::new("contactInfo", "invalid phone number"));
            None
        }
        _ => Some(info.to_string()),
    }
}

fn check_guests(value: Option<&Value>, errors: &mut Vec<FieldError>) -> Option<u8> {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if (0..=MAX_GUESTS).contains(&n) => Some(n as u8),
        _ => {
            errors.push(FieldError::new(
                "guests",
                format!("guests must be an integer between 0 and {}", MAX_GUESTS),
            ));
            None
        }
    }
}

/// Check email address syntax.
pub fn is_email(value: &str) -> bool {
    if value.len() > MAX_EMAIL_LEN {
        return false;
    }

    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };

    local.len() <= MAX_EMAIL_LOCAL_LEN
        && domain.len() <= MAX_EMAIL_DOMAIN_LEN
        && EMAIL_LOCAL.is_match(local)
        && EMAIL_DOMAIN.is_match(domain)
}

/// Check Mexican mobile phone syntax.
pub fn is_mx_mobile(value: &str) -> bool {
    MX_MOBILE.is_match(value)
}

/// Replace HTML-significant characters with entities.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            c => out.push(c),
        }
    }
    out
}
