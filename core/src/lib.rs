//! # EventPass Core
//!
//! Domain core for an event registration and attendance service.
//!
//! Organizers publish events with tiered tickets, attendees register and
//! receive a scannable code, and organizers check attendees in by scanning
//! that code. This crate holds the parts that must stay correct under
//! concurrent access:
//!
//! - **Identity**: resolve an opaque bearer credential into a user and role
//! - **Authorization**: role-gated capabilities (`Grant<O>`) built from an
//!   explicit [`authz::AccessPolicy`] table
//! - **Ticket inventory**: tier validation, defaults and replacement
//! - **Registration**: exactly-once membership of a user in an event
//! - **QR codec**: `{eventId, userId}` to and from an opaque string
//! - **Attendance**: exactly-once check-in, only for registered users
//! - **Catalog**: create, update, delete and query events with ownership and
//!   visibility rules
//!
//! ## Architecture
//!
//! ```text
//! credential ─► IdentityResolver ─► Identity
//!                                      │
//!                                      ▼
//!                             AuthorizationGuard ─► Grant<O>
//!                                                      │
//!              ┌───────────────────────┬───────────────┴──────────┐
//!              ▼                       ▼                          ▼
//!        EventCatalog         RegistrationService        AttendanceScanner
//!        (TicketInventory)    (QrCodec)                  (QrCodec)
//!              │                       │                          │
//!              └───────────────────────┴──────────────────────────┘
//!                                      │
//!                                      ▼
//!                          EventRepository (storage boundary)
//! ```
//!
//! All persistence goes through [`repository::EventRepository`], whose
//! registration and attendance writes are atomic conditional writes. The
//! services never hold in-process locks, so several instances can share one
//! database.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attendance;
pub mod authz;
pub mod catalog;
pub mod environment;
pub mod error;
pub mod identity;
pub mod inventory;
pub mod metrics;
pub mod qr;
pub mod registration;
pub mod repository;
pub mod types;

pub use attendance::{AttendanceScanner, CheckInPolicy, CheckInReceipt};
pub use authz::{
    AccessPolicy, AuthorizationGuard, Decision, DenyReason, Grant, Operation, OperationKind, ops,
};
pub use catalog::{EventCatalog, EventPatch, EventQuery, NewEvent};
pub use environment::{Clock, SystemClock};
pub use error::{ErrorKind, EventPassError, Resource, Result};
pub use identity::{
    Identity, IdentityResolver, SignedTokenVerifier, TokenClaims, TokenVerifier, UserDirectory,
};
pub use inventory::{TicketInventory, TierSpec};
pub use qr::{QrCodec, QrPayload};
pub use registration::{Confirmation, RegistrationService};
pub use repository::{
    AttendanceOutcome, EventFilter, EventRepository, RegistrationOutcome, TierWrite,
    UpdateOutcome,
};
pub use types::*;
