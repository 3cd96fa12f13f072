//! Event RSVP backend.
//!
//! Accepts attendance registrations over HTTP, validates and deduplicates
//! them against the attendee table, and sends each new registrant a
//! confirmation by email or WhatsApp.

pub mod api;
pub mod attendee;
pub mod config;
pub mod error;
pub mod notify;

pub use attendee::{Attendee, AttendeeStore, ContactMethod, NewAttendee};
pub use config::Config;
pub use error::{RsvpError, StoreError};
pub use notify::Notifier;
