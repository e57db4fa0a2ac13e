//! HTTP request handlers, one module per resource.

pub mod check_ins;
pub mod events;
pub mod health;
pub mod identity;
pub mod registrations;

pub use health::health_check;

use eventpass_core::error::EventPassError;
use eventpass_core::types::EventId;

/// Parse an `:id` path segment.
fn parse_event_id(raw: &str) -> Result<EventId, EventPassError> {
    raw.trim()
        .parse()
        .map_err(|_| EventPassError::validation("id", format!("'{raw}' is not a valid event id")))
}
