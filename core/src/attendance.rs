//! QR check-in.
//!
//! Scanning decodes the payload, then records attendance with a
//! set-if-unset write, so a replayed or concurrently scanned code is
//! accepted exactly once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::authz::{Grant, ops};
use crate::environment::Clock;
use crate::error::{EventPassError, Resource, Result};
use crate::metrics;
use crate::qr::QrCodec;
use crate::repository::{AttendanceOutcome, EventRepository};
use crate::types::{EventId, UserId};

/// Which organizers may check attendees in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckInPolicy {
    /// Any organizer may scan any event's codes
    #[default]
    AnyOrganizer,
    /// Only the event's own organizer may scan its codes
    EventOwner,
}

impl CheckInPolicy {
    /// Configuration name of the policy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AnyOrganizer => "any-organizer",
            Self::EventOwner => "event-owner",
        }
    }
}

impl fmt::Display for CheckInPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckInPolicy {
    type Err = EventPassError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "any-organizer" => Ok(Self::AnyOrganizer),
            "event-owner" => Ok(Self::EventOwner),
            other => Err(EventPassError::validation(
                "check_in_policy",
                format!("expected 'any-organizer' or 'event-owner', got '{other}'"),
            )),
        }
    }
}

/// A successful check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckInReceipt {
    /// Event checked into
    pub event_id: EventId,
    /// Attendee
    pub user_id: UserId,
    /// When attendance was recorded
    pub attended_at: DateTime<Utc>,
    /// Organizer who scanned the code
    pub checked_in_by: UserId,
}

/// Checks registered attendees in by scanned code.
pub struct AttendanceScanner<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: CheckInPolicy,
}

impl<R: EventRepository> AttendanceScanner<R> {
    /// Create a scanner
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>, policy: CheckInPolicy) -> Self {
        Self {
            repository,
            clock,
            policy,
        }
    }

    /// The policy in force
    pub const fn policy(&self) -> CheckInPolicy {
        self.policy
    }

    /// Check in the holder of `encoded`.
    ///
    /// # Errors
    ///
    /// In the order they are checked:
    /// - [`EventPassError::InvalidPayload`] if the code does not decode
    /// - [`EventPassError::NotFound`] if the event does not exist
    /// - [`EventPassError::Forbidden`] if the policy limits scanning to the
    ///   event owner and the grant holder is someone else
    /// - [`EventPassError::NotRegistered`] if the user is not registered
    /// - [`EventPassError::AlreadyCheckedIn`] if attendance is already marked
    #[tracing::instrument(skip_all, fields(organizer = %grant.user_id()))]
    pub async fn check_in(
        &self,
        grant: &Grant<ops::CheckIn>,
        encoded: &str,
    ) -> Result<CheckInReceipt> {
        let result = self.try_check_in(grant.user_id(), encoded).await;
        metrics::record_check_in(match &result {
            Ok(_) => "marked",
            Err(EventPassError::AlreadyCheckedIn) => "already_checked_in",
            Err(EventPassError::NotRegistered) => "not_registered",
            Err(EventPassError::InvalidPayload { .. }) => "invalid_payload",
            Err(_) => "rejected",
        });
        result
    }

    async fn try_check_in(&self, organizer: UserId, encoded: &str) -> Result<CheckInReceipt> {
        let payload = QrCodec::decode(encoded).inspect_err(|e| {
            tracing::debug!(error = %e, "Undecodable check-in code");
        })?;
        let (event_id, user_id) = (payload.event_id, payload.user_id);

        let event = self
            .repository
            .get(event_id)
            .await?
            .ok_or_else(|| EventPassError::not_found(Resource::Event, event_id))?;

        if self.policy == CheckInPolicy::EventOwner && !event.is_owned_by(organizer) {
            tracing::warn!(%event_id, "Organizer attempted to scan another organizer's event");
            metrics::record_authorization_denied("not_owner");
            return Err(EventPassError::forbidden(
                "Only the event organizer may check in attendees",
            ));
        }
        if !event.is_registered(user_id) {
            return Err(EventPassError::NotRegistered);
        }
        if event.has_attended(user_id) {
            return Err(EventPassError::AlreadyCheckedIn);
        }

        match self
            .repository
            .mark_attended(event_id, user_id, self.clock.now())
            .await?
        {
            AttendanceOutcome::Marked(attended_at) => {
                tracing::info!(%event_id, %user_id, "Attendance marked successfully");
                Ok(CheckInReceipt {
                    event_id,
                    user_id,
                    attended_at,
                    checked_in_by: organizer,
                })
            }
            AttendanceOutcome::AlreadyCheckedIn => {
                tracing::debug!(%event_id, %user_id, "Lost check-in race to a concurrent scan");
                Err(EventPassError::AlreadyCheckedIn)
            }
            AttendanceOutcome::NotRegistered => Err(EventPassError::NotRegistered),
            AttendanceOutcome::EventNotFound => {
                Err(EventPassError::not_found(Resource::Event, event_id))
            }
        }
    }
}

impl<R> fmt::Debug for AttendanceScanner<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttendanceScanner")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
