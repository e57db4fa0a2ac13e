//! `PostgreSQL` storage for EventPass.
//!
//! Implements [`EventRepository`](eventpass_core::repository::EventRepository)
//! and [`UserDirectory`](eventpass_core::identity::UserDirectory) with runtime
//! `sqlx` queries. Every invariant-guarding write is a single conditional
//! statement inside a transaction:
//!
//! - registration: `INSERT … ON CONFLICT DO NOTHING` on `(event_id, user_id)`
//! - tier inventory: `UPDATE … SET remaining = remaining - 1 WHERE remaining > 0`
//! - check-in: `UPDATE … SET attended_at = $n WHERE attended_at IS NULL`
//! - event edits: `UPDATE … WHERE version = $n`
//!
//! # Example
//!
//! ```no_run
//! use eventpass_postgres::PostgresEventRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = sqlx::PgPool::connect("postgres://localhost/eventpass").await?;
//! let repository = PostgresEventRepository::new(pool);
//! repository.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod events;
mod users;

pub use events::PostgresEventRepository;
pub use users::PostgresUserDirectory;

use eventpass_core::error::EventPassError;

/// Map a `sqlx` error into an opaque storage error, logging the detail.
fn storage_error(context: &'static str, error: &sqlx::Error) -> EventPassError {
    tracing::error!(error = %error, context, "Database operation failed");
    EventPassError::Storage(format!("{context}: {error}"))
}

/// Map a value that does not fit its column type.
fn corrupt(context: &'static str, detail: impl std::fmt::Display) -> EventPassError {
    tracing::error!(%detail, context, "Stored value out of range");
    EventPassError::Storage(format!("{context}: {detail}"))
}
