//! Domain types for events, tickets, users and registrations.
//!
//! Identifiers are UUID newtypes. Money is carried in cents. Event membership
//! (`registered`, `attended`) is stored as ordered id sets so that equality
//! and serialization are deterministic.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{EventPassError, Result};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ============================================================================
// Users
// ============================================================================

/// Role of a user. Fixed at account creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Publishes events and scans attendees in
    Organizer,
    /// Registers for events
    Attendee,
}

impl Role {
    /// Lowercase wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Organizer => "organizer",
            Self::Attendee => "attendee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = EventPassError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "organizer" => Ok(Self::Organizer),
            "attendee" => Ok(Self::Attendee),
            other => Err(EventPassError::validation(
                "role",
                format!("unknown role '{other}'"),
            )),
        }
    }
}

/// A user record as seen by this subsystem (read-only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: UserId,
    /// User role
    pub role: Role,
}

impl User {
    /// Create a user record
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Who can see an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed for everyone, including anonymous viewers
    #[default]
    Public,
    /// Listed only for signed-in organizers and attendees
    Private,
}

impl Visibility {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = EventPassError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(EventPassError::validation(
                "visibility",
                format!("expected 'public' or 'private', got '{other}'"),
            )),
        }
    }
}

/// Calendar date/time of an event, always normalized to UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventDate(DateTime<Utc>);

impl EventDate {
    /// Wrap a UTC timestamp
    #[must_use]
    pub const fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Parse an ISO-8601 date.
    ///
    /// Accepts a full RFC 3339 timestamp (`2025-06-01T18:30:00+02:00`),
    /// a timestamp without offset (taken as UTC) or a bare calendar date
    /// (midnight UTC).
    ///
    /// # Errors
    ///
    /// Returns a validation error when the input is not a valid calendar date.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if let Ok(at) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self(at.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Self(naive.and_utc()));
            }
        }
        if let Some(midnight) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(Self(midnight.and_utc()));
        }

        Err(EventPassError::validation(
            "date",
            format!("'{input}' is not a valid ISO-8601 date"),
        ))
    }

    /// The UTC timestamp
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// One ticket tier of an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketTier {
    /// Tier name, drawn from the configured allowed set
    pub name: String,
    /// Price per ticket
    pub price: Money,
    /// Tickets still available in this tier
    pub remaining: u32,
}

/// The organizer-editable part of an event.
///
/// Updates replace this as a whole under a version check; membership lives
/// outside it so registrations never conflict with an organizer's edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Title (non-empty)
    pub title: String,
    /// Description (non-empty)
    pub description: String,
    /// When the event takes place
    pub date: EventDate,
    /// Where the event takes place (non-empty)
    pub location: String,
    /// Who can see it
    pub visibility: Visibility,
    /// Ordered ticket tiers
    pub tiers: Vec<TicketTier>,
}

impl EventDetails {
    /// Find a tier by exact name
    #[must_use]
    pub fn tier(&self, name: &str) -> Option<&TicketTier> {
        self.tiers.iter().find(|tier| tier.name == name)
    }
}

/// A published event with its membership sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event id
    pub id: EventId,
    /// Creating organizer, immutable after creation
    pub organizer: UserId,
    /// Editable details
    #[serde(flatten)]
    pub details: EventDetails,
    /// Registered users
    pub registered: BTreeSet<UserId>,
    /// Checked-in users, always a subset of `registered`
    pub attended: BTreeSet<UserId>,
    /// Bumped on every detail or tier update
    pub version: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last detail update time
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// A freshly published event with no registrations.
    #[must_use]
    pub const fn publish(
        id: EventId,
        organizer: UserId,
        details: EventDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organizer,
            details,
            registered: BTreeSet::new(),
            attended: BTreeSet::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user` organized this event
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.organizer == user
    }

    /// Whether `user` is registered
    #[must_use]
    pub fn is_registered(&self, user: UserId) -> bool {
        self.registered.contains(&user)
    }

    /// Whether `user` has been checked in
    #[must_use]
    pub fn has_attended(&self, user: UserId) -> bool {
        self.attended.contains(&user)
    }
}

/// Membership of one user in one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Event registered for
    pub event_id: EventId,
    /// Registered user
    pub user_id: UserId,
    /// Tier the registration consumed, if any
    pub tier: Option<String>,
    /// When the registration was accepted
    pub registered_at: DateTime<Utc>,
    /// Set once, at check-in
    pub attended_at: Option<DateTime<Utc>>,
}

impl RegistrationRecord {
    /// A new, not yet attended registration
    #[must_use]
    pub const fn new(
        event_id: EventId,
        user_id: UserId,
        tier: Option<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id,
            user_id,
            tier,
            registered_at,
            attended_at: None,
        }
    }

    /// Whether the user has been checked in
    #[must_use]
    pub const fn has_attended(&self) -> bool {
        self.attended_at.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_with_offset() {
        let date = EventDate::parse("2025-06-01T18:30:00+02:00").unwrap();
        assert_eq!(
            *date.as_datetime(),
            Utc.with_ymd_and_hms(2025, 6, 1, 16, 30, 0).unwrap()
        );
    }

    #[test]
    fn parses_bare_date_as_midnight_utc() {
        let date = EventDate::parse("2025-06-01").unwrap();
        assert_eq!(
            *date.as_datetime(),
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn parses_naive_timestamp_as_utc() {
        let date = EventDate::parse("2025-06-01T09:15:00").unwrap();
        assert_eq!(
            *date.as_datetime(),
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 15, 0).unwrap()
        );
    }

    #[test]
    fn rejects_invalid_calendar_dates() {
        for input in ["", "tomorrow", "2025-02-30", "2025-13-01", "01/06/2025"] {
            let err = EventDate::parse(input).unwrap_err();
            assert!(matches!(err, EventPassError::Validation { .. }), "{input}");
        }
    }

    #[test]
    fn role_and_visibility_wire_names() {
        assert_eq!("organizer".parse::<Role>().unwrap(), Role::Organizer);
        assert_eq!("attendee".parse::<Role>().unwrap(), Role::Attendee);
        assert!("admin".parse::<Role>().is_err());

        assert_eq!("private".parse::<Visibility>().unwrap(), Visibility::Private);
        assert!("Public".parse::<Visibility>().is_err());
        assert_eq!(
            serde_json::to_string(&Visibility::Private).unwrap(),
            "\"private\""
        );
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(12_345).to_string(), "$123.45");
        assert!(Money::default().is_zero());
    }
}
