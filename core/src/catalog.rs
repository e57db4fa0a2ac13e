//! Event catalog: create, update, delete and query events.
//!
//! Mutations require a grant for the operation *and* ownership of the event.
//! The ownership check runs before the patch is validated, so a non-owner is
//! refused the same way whatever they send. Queries apply the visibility rule:
//! only signed-in organizers and attendees see private events.

use serde::Deserialize;
use std::sync::Arc;

use crate::authz::{Grant, Operation, ops};
use crate::environment::Clock;
use crate::error::{EventPassError, Resource, Result};
use crate::identity::Identity;
use crate::inventory::{TicketInventory, TierSpec};
use crate::metrics;
use crate::repository::{EventFilter, EventRepository, TierWrite, UpdateOutcome};
use crate::types::{Event, EventDate, EventDetails, EventId, RegistrationRecord, Visibility};

/// Input for publishing an event.
///
/// Text fields default to empty so that missing fields are reported as
/// validation errors naming the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewEvent {
    /// Title
    #[serde(default)]
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// ISO-8601 date
    #[serde(default)]
    pub date: String,
    /// Location
    #[serde(default)]
    pub location: String,
    /// `public` or `private`
    #[serde(default, alias = "event_type")]
    pub visibility: String,
    /// Ticket tiers; the default tier is used when absent or empty
    #[serde(default, alias = "tickets")]
    pub tiers: Option<Vec<TierSpec>>,
}

/// Partial update of an event. Absent fields are left unchanged.
///
/// There is no organizer field: ownership cannot be transferred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New ISO-8601 date
    pub date: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New visibility
    #[serde(alias = "event_type")]
    pub visibility: Option<String>,
    /// Replacement tier list (full overwrite)
    #[serde(alias = "tickets")]
    pub tiers: Option<Vec<TierSpec>>,
}

impl EventPatch {
    /// Whether the patch changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.location.is_none()
            && self.visibility.is_none()
            && self.tiers.is_none()
    }
}

/// Raw list filters, as they arrive in a query string. Blank values are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventQuery {
    /// Events on or after this ISO-8601 date
    pub date: Option<String>,
    /// Location substring
    pub location: Option<String>,
    /// `public` or `private`
    #[serde(alias = "event_type")]
    pub visibility: Option<String>,
    /// Title or description substring
    pub search: Option<String>,
}

impl EventQuery {
    /// Parse into a storage filter.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unparsable date or visibility.
    pub fn to_filter(&self) -> Result<EventFilter> {
        Ok(EventFilter {
            date_from: non_blank(self.date.as_deref())
                .map(EventDate::parse)
                .transpose()?
                .map(|date| *date.as_datetime()),
            location: non_blank(self.location.as_deref()).map(str::to_owned),
            visibility: non_blank(self.visibility.as_deref())
                .map(str::parse)
                .transpose()?,
            search: non_blank(self.search.as_deref()).map(str::to_owned),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EventPassError::validation(field, "is required"));
    }
    Ok(trimmed.to_owned())
}

fn parse_visibility(value: &str) -> Result<Visibility> {
    value.trim().parse()
}

/// Create, update, delete and query events.
pub struct EventCatalog<R> {
    repository: Arc<R>,
    inventory: TicketInventory,
    clock: Arc<dyn Clock>,
}

impl<R: EventRepository> EventCatalog<R> {
    /// Create a catalog
    pub fn new(repository: Arc<R>, inventory: TicketInventory, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            inventory,
            clock,
        }
    }

    /// The tier rules in force
    pub const fn inventory(&self) -> &TicketInventory {
        &self.inventory
    }

    /// Publish a new event owned by the grant holder.
    ///
    /// # Errors
    ///
    /// - [`EventPassError::Validation`] for a blank title, description or
    ///   location, an invalid date or visibility, or an invalid tier
    /// - [`EventPassError::Storage`] if the insert fails
    #[tracing::instrument(skip_all, fields(organizer = %grant.user_id()))]
    pub async fn create(&self, grant: &Grant<ops::CreateEvent>, new: NewEvent) -> Result<Event> {
        let details = EventDetails {
            title: required_text("title", &new.title)?,
            description: required_text("description", &new.description)?,
            date: EventDate::parse(&new.date)?,
            location: required_text("location", &new.location)?,
            visibility: parse_visibility(&new.visibility)?,
            tiers: self.inventory.resolve(new.tiers.as_deref())?,
        };

        let event = Event::publish(EventId::new(), grant.user_id(), details, self.clock.now());
        self.repository.insert(&event).await?;

        metrics::record_event_created();
        tracing::info!(
            event_id = %event.id,
            visibility = %event.details.visibility,
            tiers = event.details.tiers.len(),
            "Event published"
        );
        Ok(event)
    }

    /// Apply a partial update to an owned event.
    ///
    /// # Errors
    ///
    /// - [`EventPassError::NotFound`] if the event does not exist
    /// - [`EventPassError::Forbidden`] if the grant holder is not the organizer
    /// - [`EventPassError::Validation`] if a patched field is invalid
    /// - [`EventPassError::StaleWrite`] if the event changed concurrently
    #[tracing::instrument(skip_all, fields(event_id = %id, user_id = %grant.user_id()))]
    pub async fn update(
        &self,
        grant: &Grant<ops::UpdateEvent>,
        id: EventId,
        patch: EventPatch,
    ) -> Result<Event> {
        let event = self.load_owned(grant, id).await?;
        let tiers = if patch.tiers.is_some() {
            TierWrite::Replace
        } else {
            TierWrite::Keep
        };
        let details = self.apply_patch(event.details.clone(), patch)?;

        match self
            .repository
            .update_details(id, event.version, &details, tiers, self.clock.now())
            .await?
        {
            UpdateOutcome::Updated(updated) => {
                metrics::record_event_updated();
                tracing::info!(version = updated.version, "Event updated");
                Ok(updated)
            }
            UpdateOutcome::NotFound => Err(EventPassError::not_found(Resource::Event, id)),
            UpdateOutcome::VersionMismatch => {
                tracing::debug!(expected = event.version, "Concurrent update detected");
                Err(EventPassError::StaleWrite)
            }
        }
    }

    /// Delete an owned event. All further operations on it yield not found.
    ///
    /// # Errors
    ///
    /// - [`EventPassError::NotFound`] if the event does not exist
    /// - [`EventPassError::Forbidden`] if the grant holder is not the organizer
    #[tracing::instrument(skip_all, fields(event_id = %id, user_id = %grant.user_id()))]
    pub async fn delete(&self, grant: &Grant<ops::DeleteEvent>, id: EventId) -> Result<()> {
        self.load_owned(grant, id).await?;

        if !self.repository.delete(id).await? {
            return Err(EventPassError::not_found(Resource::Event, id));
        }

        metrics::record_event_deleted();
        tracing::info!("Event deleted");
        Ok(())
    }

    /// Fetch one event as seen by `viewer`.
    ///
    /// # Errors
    ///
    /// Returns [`EventPassError::NotFound`] if the event does not exist or is
    /// private and the viewer may not see private events.
    pub async fn get(&self, viewer: &Identity, id: EventId) -> Result<Event> {
        self.repository
            .get(id)
            .await?
            .filter(|event| {
                event.details.visibility == Visibility::Public || viewer.sees_private_events()
            })
            .ok_or_else(|| EventPassError::not_found(Resource::Event, id))
    }

    /// List events matching `query` as seen by `viewer`.
    ///
    /// Viewers who may not see private events get public events only,
    /// whatever visibility they asked for. Ordering is by creation time,
    /// then id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unparsable filter.
    #[tracing::instrument(skip_all, fields(role = ?viewer.role()))]
    pub async fn query(&self, viewer: &Identity, query: &EventQuery) -> Result<Vec<Event>> {
        let mut filter = query.to_filter()?;
        if !viewer.sees_private_events() {
            filter.visibility = Some(Visibility::Public);
        }

        let events = self.repository.list(&filter).await?;
        tracing::debug!(count = events.len(), "Listed events");
        Ok(events)
    }

    /// Registrations of an owned event.
    ///
    /// # Errors
    ///
    /// - [`EventPassError::NotFound`] if the event does not exist
    /// - [`EventPassError::Forbidden`] if the grant holder is not the organizer
    pub async fn roster(
        &self,
        grant: &Grant<ops::ViewRoster>,
        id: EventId,
    ) -> Result<Vec<RegistrationRecord>> {
        self.load_owned(grant, id).await?;
        self.repository.registrations(id).await
    }

    /// Load an event the grant holder organizes.
    ///
    /// Lets callers settle ownership before parsing a request body.
    ///
    /// # Errors
    ///
    /// - [`EventPassError::NotFound`] if the event does not exist
    /// - [`EventPassError::Forbidden`] if the grant holder is not the organizer
    pub async fn load_owned<O: Operation>(&self, grant: &Grant<O>, id: EventId) -> Result<Event> {
        let event = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| EventPassError::not_found(Resource::Event, id))?;

        if !event.is_owned_by(grant.user_id()) {
            tracing::warn!(
                event_id = %id,
                user_id = %grant.user_id(),
                operation = %O::KIND,
                "Non-owner attempted to modify event"
            );
            metrics::record_authorization_denied("not_owner");
            return Err(EventPassError::forbidden("Not authorized"));
        }
        Ok(event)
    }

    fn apply_patch(&self, mut details: EventDetails, patch: EventPatch) -> Result<EventDetails> {
        if let Some(title) = patch.title {
            details.title = required_text("title", &title)?;
        }
        if let Some(description) = patch.description {
            details.description = required_text("description", &description)?;
        }
        if let Some(date) = patch.date {
            details.date = EventDate::parse(&date)?;
        }
        if let Some(location) = patch.location {
            details.location = required_text("location", &location)?;
        }
        if let Some(visibility) = patch.visibility {
            details.visibility = parse_visibility(&visibility)?;
        }
        if let Some(tiers) = patch.tiers {
            details = self.inventory.replace_all(details, &tiers)?;
        }
        Ok(details)
    }
}

impl<R> std::fmt::Debug for EventCatalog<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCatalog")
            .field("inventory", &self.inventory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_values_are_ignored() {
        let query = EventQuery {
            date: Some(String::new()),
            location: Some("  ".into()),
            visibility: None,
            search: Some("rust".into()),
        };
        assert_eq!(
            query.to_filter().unwrap(),
            EventFilter {
                search: Some("rust".into()),
                ..EventFilter::default()
            }
        );
    }

    #[test]
    fn bad_query_values_are_validation_errors() {
        let bad_date = EventQuery {
            date: Some("someday".into()),
            ..EventQuery::default()
        };
        let bad_visibility = EventQuery {
            visibility: Some("secret".into()),
            ..EventQuery::default()
        };
        assert!(matches!(bad_date.to_filter(), Err(EventPassError::Validation { .. })));
        assert!(matches!(
            bad_visibility.to_filter(),
            Err(EventPassError::Validation { .. })
        ));
    }

    #[test]
    fn patch_ignores_unknown_fields_including_organizer() {
        let patch: EventPatch = serde_json::from_str(
            r#"{"title":"New","organizer":"00000000-0000-0000-0000-000000000000","event_type":"private"}"#,
        )
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("New"));
        assert_eq!(patch.visibility.as_deref(), Some("private"));
        assert!(!patch.is_empty());
        assert!(EventPatch::default().is_empty());
    }

    #[test]
    fn new_event_accepts_legacy_field_names() {
        let new: NewEvent = serde_json::from_str(
            r#"{"title":"T","description":"D","date":"2025-01-02","location":"L",
                "event_type":"public","tickets":[{"tier":"VIP","price":100,"available_quantity":3}]}"#,
        )
        .unwrap();
        assert_eq!(new.visibility, "public");
        assert_eq!(new.tiers.unwrap()[0], TierSpec::new("VIP", 100, 3));
    }
}
