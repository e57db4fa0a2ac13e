//! Attendee registration.
//!
//! A user holds at most one registration per event. The check against the
//! loaded event is a fast path only: the repository's add-if-absent write is
//! what decides, so concurrent duplicate calls yield exactly one success.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::authz::{Grant, ops};
use crate::environment::Clock;
use crate::error::{EventPassError, Resource, Result};
use crate::metrics;
use crate::qr::{QrCodec, QrPayload};
use crate::repository::{EventRepository, RegistrationOutcome};
use crate::types::{EventId, RegistrationRecord, UserId};

/// A successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    /// Event registered for
    pub event_id: EventId,
    /// Registered user
    pub user_id: UserId,
    /// Tier consumed, if any
    pub tier: Option<String>,
    /// When the registration was accepted
    pub registered_at: DateTime<Utc>,
    /// Encoded check-in code
    pub qr_code: String,
}

impl Confirmation {
    /// The payload carried by `qr_code`
    #[must_use]
    pub const fn payload(&self) -> QrPayload {
        QrPayload::new(self.event_id, self.user_id)
    }
}

/// Registers attendees for events.
pub struct RegistrationService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R: EventRepository> RegistrationService<R> {
    /// Create a registration service
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Register the grant holder for `event_id`, optionally against a tier.
    ///
    /// Without a tier the registration does not touch inventory. With a tier,
    /// the registration and a decrement of that tier happen atomically.
    ///
    /// # Errors
    ///
    /// - [`EventPassError::NotFound`] if the event does not exist
    /// - [`EventPassError::AlreadyRegistered`] if the user is already registered
    /// - [`EventPassError::Validation`] if the tier is not offered by the event
    /// - [`EventPassError::SoldOut`] if the tier has no tickets left
    #[tracing::instrument(skip_all, fields(event_id = %event_id, user_id = %grant.user_id()))]
    pub async fn register(
        &self,
        grant: &Grant<ops::Register>,
        event_id: EventId,
        tier: Option<&str>,
    ) -> Result<Confirmation> {
        let result = self.try_register(grant.user_id(), event_id, tier).await;
        metrics::record_registration(match &result {
            Ok(_) => "registered",
            Err(EventPassError::AlreadyRegistered) => "already_registered",
            Err(EventPassError::SoldOut { .. }) => "sold_out",
            Err(_) => "rejected",
        });
        result
    }

    async fn try_register(
        &self,
        user_id: UserId,
        event_id: EventId,
        tier: Option<&str>,
    ) -> Result<Confirmation> {
        let event = self
            .repository
            .get(event_id)
            .await?
            .ok_or_else(|| EventPassError::not_found(Resource::Event, event_id))?;

        if event.is_registered(user_id) {
            tracing::debug!("User already registered");
            return Err(EventPassError::AlreadyRegistered);
        }
        if let Some(name) = tier {
            if event.details.tier(name).is_none() {
                return Err(unknown_tier(name));
            }
        }

        let record = RegistrationRecord::new(
            event_id,
            user_id,
            tier.map(str::to_owned),
            self.clock.now(),
        );

        match self.repository.add_registration(&record).await? {
            RegistrationOutcome::Registered => {
                tracing::info!(tier = ?record.tier, "Registration successful");
                let qr_code = QrCodec::encode(&QrPayload::new(event_id, user_id));
                Ok(Confirmation {
                    event_id,
                    user_id,
                    tier: record.tier,
                    registered_at: record.registered_at,
                    qr_code,
                })
            }
            RegistrationOutcome::AlreadyRegistered => {
                tracing::debug!("Lost registration race to a concurrent request");
                Err(EventPassError::AlreadyRegistered)
            }
            RegistrationOutcome::EventNotFound => {
                Err(EventPassError::not_found(Resource::Event, event_id))
            }
            RegistrationOutcome::UnknownTier => Err(unknown_tier(tier.unwrap_or_default())),
            RegistrationOutcome::SoldOut => {
                let tier = tier.unwrap_or_default().to_owned();
                tracing::debug!(tier = %tier, "Tier sold out");
                Err(EventPassError::SoldOut { tier })
            }
        }
    }
}

fn unknown_tier(name: &str) -> EventPassError {
    EventPassError::validation("tier", format!("event has no tier named '{name}'"))
}

impl<R> std::fmt::Debug for RegistrationService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationService").finish_non_exhaustive()
    }
}
