//! Event repository trait.
//!
//! The storage boundary for events and their registrations. Every write that
//! guards an invariant is an atomic conditional write in the implementation
//! (add-if-absent, set-if-unset, decrement-if-positive, compare-and-set on
//! the version), so correctness does not depend on in-process locks and holds
//! across several service instances sharing one store.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Event, EventDetails, EventId, RegistrationRecord, UserId, Visibility};

/// Result of [`EventRepository::update_details`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Details replaced; carries the event as stored after the update
    Updated(Event),
    /// The event does not exist
    NotFound,
    /// The stored version no longer matches the expected one
    VersionMismatch,
}

/// What [`EventRepository::update_details`] does with the stored tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierWrite {
    /// Keep the stored tiers and their remaining counts
    Keep,
    /// Overwrite the stored tiers with those in the new details
    Replace,
}

/// Result of [`EventRepository::add_registration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Membership added (and the tier decremented, if one was named)
    Registered,
    /// The user already holds a registration; nothing changed
    AlreadyRegistered,
    /// The event does not exist
    EventNotFound,
    /// The named tier does not exist on the event
    UnknownTier,
    /// The named tier has no tickets left; nothing changed
    SoldOut,
}

/// Result of [`EventRepository::mark_attended`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceOutcome {
    /// Attendance recorded at the given time
    Marked(DateTime<Utc>),
    /// The user has no registration for the event
    NotRegistered,
    /// Attendance was already recorded; nothing changed
    AlreadyCheckedIn,
    /// The event does not exist
    EventNotFound,
}

/// Filters for listing events. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Events on or after this instant
    pub date_from: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the location
    pub location: Option<String>,
    /// Exact visibility
    pub visibility: Option<Visibility>,
    /// Case-insensitive substring of the title or the description
    pub search: Option<String>,
}

impl EventFilter {
    /// Whether `event` passes every filter that is set.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let details = &event.details;

        self.date_from
            .is_none_or(|from| *details.date.as_datetime() >= from)
            && self
                .location
                .as_deref()
                .is_none_or(|needle| contains_ignore_case(&details.location, needle))
            && self.visibility.is_none_or(|v| details.visibility == v)
            && self.search.as_deref().is_none_or(|needle| {
                contains_ignore_case(&details.title, needle)
                    || contains_ignore_case(&details.description, needle)
            })
    }
}

/// Case-insensitive substring test.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Event repository.
///
/// This trait abstracts over event storage (PostgreSQL in production, an
/// in-memory map in tests).
pub trait EventRepository: Send + Sync {
    /// Insert a newly published event.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails or the id already exists.
    fn insert(&self, event: &Event) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Load an event with its membership sets.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn get(&self, id: EventId)
    -> impl std::future::Future<Output = Result<Option<Event>>> + Send;

    /// List events passing `filter`, ordered by `(created_at, id)`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn list(
        &self,
        filter: &EventFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Event>>> + Send;

    /// Replace the details of an event if its version is still
    /// `expected_version`, bumping the version.
    ///
    /// Tiers are written only with [`TierWrite::Replace`]; otherwise the
    /// stored tiers stay as they are, since registrations may have
    /// decremented them after `details` was read.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn update_details(
        &self,
        id: EventId,
        expected_version: u64,
        details: &EventDetails,
        tiers: TierWrite,
        updated_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<UpdateOutcome>> + Send;

    /// Delete an event with its tiers and registrations.
    ///
    /// Returns `false` if the event did not exist.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn delete(&self, id: EventId) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Add a registration if the user holds none for the event.
    ///
    /// When the record names a tier, that tier's `remaining` is decremented
    /// in the same atomic unit, and only if it is positive.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn add_registration(
        &self,
        record: &RegistrationRecord,
    ) -> impl std::future::Future<Output = Result<RegistrationOutcome>> + Send;

    /// Record attendance if the user is registered and not yet checked in.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn mark_attended(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<AttendanceOutcome>> + Send;

    /// Load one registration.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<RegistrationRecord>>> + Send;

    /// Load every registration of an event, ordered by `(registered_at, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn registrations(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Vec<RegistrationRecord>>> + Send;

    /// Check that storage is reachable (readiness probe).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be reached.
    fn ping(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{EventDate, UserId};

    fn event(
        title: &str,
        description: &str,
        location: &str,
        date: &str,
        visibility: Visibility,
    ) -> Event {
        Event::publish(
            EventId::new(),
            UserId::new(),
            EventDetails {
                title: title.into(),
                description: description.into(),
                date: EventDate::parse(date).unwrap(),
                location: location.into(),
                visibility,
                tiers: Vec::new(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn empty_filter_matches_everything() {
        let e = event("Rust Meetup", "Talks", "Berlin", "2025-03-01", Visibility::Private);
        assert!(EventFilter::default().matches(&e));
    }

    #[test]
    fn date_filter_is_on_or_after() {
        let e = event("Rust Meetup", "Talks", "Berlin", "2025-03-01", Visibility::Public);
        let on = EventFilter {
            date_from: Some(*EventDate::parse("2025-03-01").unwrap().as_datetime()),
            ..EventFilter::default()
        };
        let after = EventFilter {
            date_from: Some(*EventDate::parse("2025-03-02").unwrap().as_datetime()),
            ..EventFilter::default()
        };
        assert!(on.matches(&e));
        assert!(!after.matches(&e));
    }

    #[test]
    fn text_filters_are_case_insensitive_substrings() {
        let e = event(
            "Rust Meetup",
            "Lightning talks",
            "Berlin Mitte",
            "2025-03-01",
            Visibility::Public,
        );

        let by_location = EventFilter {
            location: Some("MITTE".into()),
            ..EventFilter::default()
        };
        let by_title = EventFilter {
            search: Some("meetup".into()),
            ..EventFilter::default()
        };
        let by_description = EventFilter {
            search: Some("LIGHTNING".into()),
            ..EventFilter::default()
        };
        let miss = EventFilter {
            search: Some("python".into()),
            ..EventFilter::default()
        };

        assert!(by_location.matches(&e));
        assert!(by_title.matches(&e));
        assert!(by_description.matches(&e));
        assert!(!miss.matches(&e));
    }

    #[test]
    fn visibility_filter_is_exact() {
        let e = event("Board", "Quarterly", "HQ", "2025-03-01", Visibility::Private);
        let public_only = EventFilter {
            visibility: Some(Visibility::Public),
            ..EventFilter::default()
        };
        assert!(!public_only.matches(&e));
    }
}
