//! Fixtures and a service harness over in-memory storage.

use eventpass_core::attendance::{AttendanceScanner, CheckInPolicy};
use eventpass_core::authz::{AuthorizationGuard, Grant, Operation, ops};
use eventpass_core::catalog::{EventCatalog, NewEvent};
use eventpass_core::environment::Clock;
use eventpass_core::identity::Identity;
use eventpass_core::inventory::{TicketInventory, TierSpec};
use eventpass_core::registration::RegistrationService;
use eventpass_core::types::{Event, EventDate, EventDetails, Role, Visibility};
use std::sync::Arc;

use crate::directory::InMemoryUserDirectory;
use crate::mocks::{FixedClock, test_clock};
use crate::repository::InMemoryEventRepository;

/// A valid event creation request.
#[must_use]
pub fn new_event(title: &str, visibility: Visibility) -> NewEvent {
    NewEvent {
        title: title.to_owned(),
        description: format!("{title} description"),
        date: "2025-06-01T18:00:00Z".to_owned(),
        location: "Berlin".to_owned(),
        visibility: visibility.as_str().to_owned(),
        tiers: None,
    }
}

/// A valid creation request with explicit tiers.
#[must_use]
pub fn new_event_with_tiers(title: &str, tiers: Vec<TierSpec>) -> NewEvent {
    NewEvent {
        tiers: Some(tiers),
        ..new_event(title, Visibility::Public)
    }
}

/// Valid event details with the default tier.
///
/// # Panics
///
/// Never in practice: the hardcoded date always parses.
#[must_use]
#[allow(clippy::expect_used)]
pub fn sample_details() -> EventDetails {
    EventDetails {
        title: "Rust Meetup".to_owned(),
        description: "Monthly talks".to_owned(),
        date: EventDate::parse("2025-06-01").expect("hardcoded date should always parse"),
        location: "Berlin".to_owned(),
        visibility: Visibility::Public,
        tiers: TicketInventory::default().create_default(),
    }
}

/// Every service wired over shared in-memory storage and a fixed clock.
pub struct Harness {
    /// Shared clock
    pub clock: FixedClock,
    /// Shared event storage
    pub repository: Arc<InMemoryEventRepository>,
    /// User records
    pub directory: InMemoryUserDirectory,
    /// Guard with the default policy
    pub guard: AuthorizationGuard,
    /// Event catalog
    pub catalog: EventCatalog<InMemoryEventRepository>,
    /// Registration service
    pub registrations: RegistrationService<InMemoryEventRepository>,
    /// Check-in scanner
    pub scanner: AttendanceScanner<InMemoryEventRepository>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Harness with the default check-in policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(CheckInPolicy::default())
    }

    /// Harness with a specific check-in policy.
    #[must_use]
    pub fn with_policy(policy: CheckInPolicy) -> Self {
        let clock = test_clock();
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let repository = Arc::new(InMemoryEventRepository::new());

        Self {
            catalog: EventCatalog::new(
                Arc::clone(&repository),
                TicketInventory::default(),
                Arc::clone(&shared),
            ),
            registrations: RegistrationService::new(
                Arc::clone(&repository),
                Arc::clone(&shared),
            ),
            scanner: AttendanceScanner::new(Arc::clone(&repository), shared, policy),
            guard: AuthorizationGuard::default(),
            directory: InMemoryUserDirectory::new(),
            repository,
            clock,
        }
    }

    /// A new organizer, known to the directory.
    #[must_use]
    pub fn organizer(&self) -> Identity {
        Identity::User(self.directory.add(Role::Organizer))
    }

    /// A new attendee, known to the directory.
    #[must_use]
    pub fn attendee(&self) -> Identity {
        Identity::User(self.directory.add(Role::Attendee))
    }

    /// Authorize `identity` for `O`, failing the test if that is denied.
    ///
    /// # Panics
    ///
    /// Panics if the guard denies the operation.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn grant<O: Operation>(&self, identity: &Identity) -> Grant<O> {
        self.guard
            .authorize::<O>(identity)
            .expect("identity should be authorized for the operation")
    }

    /// Publish an event owned by `organizer`.
    ///
    /// # Panics
    ///
    /// Panics if `organizer` is not an organizer or creation fails.
    #[allow(clippy::expect_used)]
    pub async fn publish(&self, organizer: &Identity, visibility: Visibility) -> Event {
        let grant: Grant<ops::CreateEvent> = self.grant(organizer);
        self.catalog
            .create(&grant, new_event("Rust Meetup", visibility))
            .await
            .expect("fixture event should be valid")
    }
}
