//! Application state for Axum handlers.

use eventpass_core::attendance::{AttendanceScanner, CheckInPolicy};
use eventpass_core::authz::AuthorizationGuard;
use eventpass_core::catalog::EventCatalog;
use eventpass_core::environment::Clock;
use eventpass_core::identity::IdentityResolver;
use eventpass_core::inventory::TicketInventory;
use eventpass_core::registration::RegistrationService;
use eventpass_core::repository::EventRepository;
use std::sync::Arc;

/// Services shared by every handler.
///
/// Generic over the event repository `R` and the user directory `D`, so the
/// same router runs over `PostgreSQL` in production and in-memory storage in
/// tests.
pub struct AppState<R, D> {
    /// Credential to identity
    pub resolver: Arc<IdentityResolver<D>>,
    /// Role checks
    pub guard: Arc<AuthorizationGuard>,
    /// Event CRUD and queries
    pub catalog: Arc<EventCatalog<R>>,
    /// Registration
    pub registrations: Arc<RegistrationService<R>>,
    /// Check-in
    pub scanner: Arc<AttendanceScanner<R>>,
    /// Storage, for readiness checks
    pub repository: Arc<R>,
}

// Manual impl: derive would require `R: Clone` and `D: Clone`.
impl<R, D> Clone for AppState<R, D> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            guard: Arc::clone(&self.guard),
            catalog: Arc::clone(&self.catalog),
            registrations: Arc::clone(&self.registrations),
            scanner: Arc::clone(&self.scanner),
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: EventRepository, D> AppState<R, D> {
    /// Wire every service over one repository and one clock.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        resolver: IdentityResolver<D>,
        guard: AuthorizationGuard,
        inventory: TicketInventory,
        policy: CheckInPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog: Arc::new(EventCatalog::new(
                Arc::clone(&repository),
                inventory,
                Arc::clone(&clock),
            )),
            registrations: Arc::new(RegistrationService::new(
                Arc::clone(&repository),
                Arc::clone(&clock),
            )),
            scanner: Arc::new(AttendanceScanner::new(
                Arc::clone(&repository),
                clock,
                policy,
            )),
            resolver: Arc::new(resolver),
            guard: Arc::new(guard),
            repository,
        }
    }
}

impl<R, D> std::fmt::Debug for AppState<R, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
