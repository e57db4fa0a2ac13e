//! # EventPass Testing
//!
//! Testing utilities for EventPass.
//!
//! This crate provides:
//! - In-memory implementations of the storage and identity traits
//! - A fixed clock for deterministic timestamps
//! - A [`Harness`] wiring every service over in-memory storage
//! - Proptest strategies for ids, tiers and operation sequences
//!
//! ## Example
//!
//! ```ignore
//! use eventpass_testing::Harness;
//!
//! #[tokio::test]
//! async fn attendee_can_register() {
//!     let h = Harness::new();
//!     let organizer = h.organizer();
//!     let attendee = h.attendee();
//!     let event = h.publish(&organizer, Visibility::Public).await;
//!
//!     let confirmation = h
//!         .registrations
//!         .register(&h.grant(&attendee), event.id, None)
//!         .await
//!         .unwrap();
//!     assert_eq!(confirmation.event_id, event.id);
//! }
//! ```

use chrono::{DateTime, Utc};
use eventpass_core::environment::Clock;

pub mod directory;
pub mod fixtures;
pub mod repository;
pub mod strategies;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::advance`].
    /// Clones share the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use eventpass_testing::mocks::FixedClock;
    /// use eventpass_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub use directory::InMemoryUserDirectory;
pub use fixtures::{Harness, new_event};
pub use mocks::{FixedClock, test_clock};
pub use repository::InMemoryEventRepository;
