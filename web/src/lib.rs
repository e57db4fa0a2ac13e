//! Axum HTTP surface for EventPass.
//!
//! Handlers are thin: extract the caller, ask the guard for a grant, call
//! one core service, map the result.
//!
//! # Request Flow
//!
//! 1. **Correlation id** assigned by [`middleware::correlation_id_layer`]
//! 2. **Identity** resolved from `Authorization: Bearer …` by
//!    [`extractors::Authenticated`] or [`extractors::CurrentIdentity`]
//! 3. **Grant** issued by the `AuthorizationGuard` for the operation
//! 4. **Service call** on the catalog, registration service or scanner
//! 5. **Response** as JSON, or an [`AppError`] body `{"code", "message"}`
//!
//! # Example
//!
//! ```ignore
//! use eventpass_web::{build_router, AppState};
//!
//! let app = build_router(AppState::new(repository, resolver, guard, inventory, policy, clock));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod views;

pub use error::AppError;
pub use extractors::{ApiJson, ApiQuery, Authenticated, BearerToken, CurrentIdentity};
pub use middleware::{correlation_id_layer, CorrelationId, CORRELATION_ID_HEADER};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
