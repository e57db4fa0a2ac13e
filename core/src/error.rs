//! Error types for event registration and attendance operations.

use std::fmt;
use thiserror::Error;

/// Result type alias for EventPass operations.
pub type Result<T> = std::result::Result<T, EventPassError>;

/// Kind of resource a [`EventPassError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// An event
    Event,
    /// A user record in the identity store
    User,
    /// A ticket tier of an event
    Tier,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Event => "Event",
            Self::User => "User",
            Self::Tier => "Ticket tier",
        })
    }
}

/// Coarse error category. Every error maps to exactly one kind, and the HTTP
/// layer maps each kind to exactly one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input
    Validation,
    /// No credential, or a credential that does not verify
    Unauthenticated,
    /// Known user, operation not permitted
    Forbidden,
    /// Referenced entity does not exist
    NotFound,
    /// Operation conflicts with current state
    Conflict,
    /// Scanned code could not be decoded
    InvalidPayload,
    /// Storage or other internal failure, opaque to callers
    Internal,
}

impl ErrorKind {
    /// Stable label, used for metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidPayload => "invalid_payload",
            Self::Internal => "internal",
        }
    }
}

/// Error taxonomy for the registration and attendance subsystem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventPassError {
    // ═══════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════

    /// A field failed validation.
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// Offending field
        field: String,
        /// What was wrong with it
        reason: String,
    },

    /// A scanned code could not be decoded.
    #[error("Invalid QR code: {reason}")]
    InvalidPayload {
        /// Why decoding failed
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Authentication and Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// No credential was supplied where one is required.
    #[error("Authentication required")]
    Unauthenticated,

    /// The credential was malformed, forged or expired.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Known user, operation not permitted.
    #[error("Access Denied: {reason}")]
    Forbidden {
        /// Why access was denied
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Lookup Errors
    // ═══════════════════════════════════════════════════════════

    /// Referenced entity does not exist (or is not visible to the caller).
    #[error("{resource} not found")]
    NotFound {
        /// Kind of entity
        resource: Resource,
        /// Identifier that was looked up
        id: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Conflicts
    // ═══════════════════════════════════════════════════════════

    /// The user is already registered for the event.
    #[error("Already registered")]
    AlreadyRegistered,

    /// The user has already been checked in.
    #[error("Attendance already marked")]
    AlreadyCheckedIn,

    /// A scanned user is not registered for the event.
    #[error("User not registered for this event")]
    NotRegistered,

    /// The requested tier has no remaining tickets.
    #[error("Ticket tier '{tier}' is sold out")]
    SoldOut {
        /// Tier name
        tier: String,
    },

    /// The event changed since it was read; the update was not applied.
    #[error("Event was modified concurrently, reload and retry")]
    StaleWrite,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Storage operation failed (detail is logged, never shown).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EventPassError {
    /// Shorthand for a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a forbidden error.
    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Shorthand for a not-found error.
    #[must_use]
    pub fn not_found(resource: Resource, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Shorthand for an invalid QR payload.
    #[must_use]
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// The category this error belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// # use eventpass_core::{ErrorKind, EventPassError};
    /// assert_eq!(EventPassError::AlreadyRegistered.kind(), ErrorKind::Conflict);
    /// assert_eq!(EventPassError::InvalidCredentials.kind(), ErrorKind::Unauthenticated);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InvalidPayload { .. } => ErrorKind::InvalidPayload,
            Self::Unauthenticated | Self::InvalidCredentials => ErrorKind::Unauthenticated,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyRegistered
            | Self::AlreadyCheckedIn
            | Self::NotRegistered
            | Self::SoldOut { .. }
            | Self::StaleWrite => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Returns `true` if this error conflicts with current state.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict)
    }

    /// Returns `true` if this error is caused by the caller rather than the
    /// system.
    ///
    /// # Examples
    ///
    /// ```
    /// # use eventpass_core::EventPassError;
    /// assert!(EventPassError::NotRegistered.is_user_error());
    /// assert!(!EventPassError::Storage("timeout".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_one_kind() {
        let cases = [
            (EventPassError::validation("title", "empty"), ErrorKind::Validation),
            (EventPassError::invalid_payload("bad base64"), ErrorKind::InvalidPayload),
            (EventPassError::Unauthenticated, ErrorKind::Unauthenticated),
            (EventPassError::InvalidCredentials, ErrorKind::Unauthenticated),
            (EventPassError::forbidden("not owner"), ErrorKind::Forbidden),
            (
                EventPassError::not_found(Resource::Event, "abc"),
                ErrorKind::NotFound,
            ),
            (EventPassError::AlreadyRegistered, ErrorKind::Conflict),
            (EventPassError::AlreadyCheckedIn, ErrorKind::Conflict),
            (EventPassError::NotRegistered, ErrorKind::Conflict),
            (
                EventPassError::SoldOut { tier: "VIP".into() },
                ErrorKind::Conflict,
            ),
            (EventPassError::StaleWrite, ErrorKind::Conflict),
            (EventPassError::Storage("down".into()), ErrorKind::Internal),
        ];

        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn messages_match_api_wording() {
        assert_eq!(EventPassError::AlreadyRegistered.to_string(), "Already registered");
        assert_eq!(
            EventPassError::AlreadyCheckedIn.to_string(),
            "Attendance already marked"
        );
        assert_eq!(
            EventPassError::NotRegistered.to_string(),
            "User not registered for this event"
        );
        assert_eq!(
            EventPassError::not_found(Resource::User, "42").to_string(),
            "User not found"
        );
    }

    #[test]
    fn storage_errors_are_not_user_errors() {
        assert!(!EventPassError::Storage("x".into()).is_user_error());
        assert!(EventPassError::StaleWrite.is_conflict());
        assert!(EventPassError::NotRegistered.is_user_error());
    }
}
