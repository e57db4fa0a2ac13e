//! Response bodies.

use chrono::{DateTime, Utc};
use eventpass_core::attendance::CheckInReceipt;
use eventpass_core::registration::Confirmation;
use eventpass_core::types::{Event, EventDate, EventId, TicketTier, UserId, Visibility};
use serde::Serialize;

/// An event as returned by the API.
///
/// Membership is reported as counts; the roster endpoint lists members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventView {
    /// Event id
    pub id: EventId,
    /// Organizer
    pub organizer: UserId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// When it takes place
    pub date: EventDate,
    /// Where it takes place
    pub location: String,
    /// `public` or `private`
    pub visibility: Visibility,
    /// Ticket tiers, prices in cents
    pub tiers: Vec<TicketTier>,
    /// Number of registered users
    pub registered_count: usize,
    /// Number of checked-in users
    pub attended_count: usize,
    /// Bumped on every edit
    pub version: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last edit time
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            organizer: event.organizer,
            registered_count: event.registered.len(),
            attended_count: event.attended.len(),
            title: event.details.title,
            description: event.details.description,
            date: event.details.date,
            location: event.details.location,
            visibility: event.details.visibility,
            tiers: event.details.tiers,
            version: event.version,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Plain `{"message"}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    /// What happened
    pub message: &'static str,
}

/// Response to a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationView {
    /// Always "Registration successful"
    pub message: &'static str,
    /// The registration, including the check-in code
    #[serde(flatten)]
    pub confirmation: Confirmation,
}

impl From<Confirmation> for RegistrationView {
    fn from(confirmation: Confirmation) -> Self {
        Self {
            message: "Registration successful",
            confirmation,
        }
    }
}

/// Response to a successful check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInView {
    /// Always "Attendance marked successfully"
    pub message: &'static str,
    /// The recorded attendance
    #[serde(flatten)]
    pub receipt: CheckInReceipt,
}

impl From<CheckInReceipt> for CheckInView {
    fn from(receipt: CheckInReceipt) -> Self {
        Self {
            message: "Attendance marked successfully",
            receipt,
        }
    }
}
