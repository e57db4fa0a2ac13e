//! Role-based authorization.
//!
//! The required role for each operation lives in an [`AccessPolicy`] table.
//! [`AuthorizationGuard::authorize`] checks an [`Identity`] against that
//! table and, on success, hands out a [`Grant<O>`]. Every mutating service
//! method takes a grant for its operation, and grants can only be minted
//! here, so a role check cannot be forgotten at a call site.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{EventPassError, Resource, Result};
use crate::identity::Identity;
use crate::metrics;
use crate::types::{Role, User, UserId};

/// Operations subject to a role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    /// Publish a new event
    CreateEvent,
    /// Edit an owned event
    UpdateEvent,
    /// Delete an owned event
    DeleteEvent,
    /// Register for an event
    Register,
    /// Scan an attendee in
    CheckIn,
    /// See who registered for an owned event
    ViewRoster,
}

impl OperationKind {
    /// Every operation, in declaration order
    pub const ALL: [Self; 6] = [
        Self::CreateEvent,
        Self::UpdateEvent,
        Self::DeleteEvent,
        Self::Register,
        Self::CheckIn,
        Self::ViewRoster,
    ];

    /// Stable label, used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateEvent => "create_event",
            Self::UpdateEvent => "update_event",
            Self::DeleteEvent => "delete_event",
            Self::Register => "register",
            Self::CheckIn => "check_in",
            Self::ViewRoster => "view_roster",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-level operation marker.
pub trait Operation: sealed::Sealed {
    /// The operation this marker stands for
    const KIND: OperationKind;
}

mod sealed {
    pub trait Sealed {}
}

/// Zero-sized operation markers used as `Grant<O>` parameters.
pub mod ops {
    use super::{Operation, OperationKind, sealed::Sealed};

    macro_rules! operation {
        ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
            $(
                $(#[$doc])*
                #[derive(Debug, Clone, Copy)]
                pub struct $name;

                impl Sealed for $name {}

                impl Operation for $name {
                    const KIND: OperationKind = OperationKind::$name;
                }
            )*
        };
    }

    operation! {
        /// Permission to publish an event
        CreateEvent,
        /// Permission to edit an owned event
        UpdateEvent,
        /// Permission to delete an owned event
        DeleteEvent,
        /// Permission to register
        Register,
        /// Permission to scan attendees in
        CheckIn,
        /// Permission to view an owned event's roster
        ViewRoster,
    }
}

/// Table mapping each operation to the role allowed to perform it.
///
/// An operation with no entry is denied to everyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    table: BTreeMap<OperationKind, Role>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::empty()
            .allow(OperationKind::CreateEvent, Role::Organizer)
            .allow(OperationKind::UpdateEvent, Role::Organizer)
            .allow(OperationKind::DeleteEvent, Role::Organizer)
            .allow(OperationKind::CheckIn, Role::Organizer)
            .allow(OperationKind::ViewRoster, Role::Organizer)
            .allow(OperationKind::Register, Role::Attendee)
    }
}

impl AccessPolicy {
    /// A policy that denies everything.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Set the role required for `operation`.
    #[must_use]
    pub fn allow(mut self, operation: OperationKind, role: Role) -> Self {
        self.table.insert(operation, role);
        self
    }

    /// Role required for `operation`, if the operation is permitted at all.
    #[must_use]
    pub fn required_role(&self, operation: OperationKind) -> Option<Role> {
        self.table.get(&operation).copied()
    }
}

/// Why a role check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No credential
    Unauthenticated,
    /// Credential names no known user
    UnknownUser(UserId),
    /// Known user with a different role
    WrongRole {
        /// Role the operation needs
        required: Role,
        /// Role the user has
        actual: Role,
    },
    /// The policy has no entry for the operation
    NotPermitted,
}

impl DenyReason {
    /// Stable label, used for metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::UnknownUser(_) => "unknown_user",
            Self::WrongRole { .. } => "wrong_role",
            Self::NotPermitted => "not_permitted",
        }
    }
}

impl From<DenyReason> for EventPassError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => Self::Unauthenticated,
            DenyReason::UnknownUser(id) => Self::not_found(Resource::User, id),
            DenyReason::WrongRole { required, .. } => {
                Self::forbidden(format!("requires the {required} role"))
            }
            DenyReason::NotPermitted => Self::forbidden("operation not permitted"),
        }
    }
}

/// Outcome of a plain role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The identity holds the role
    Allowed(User),
    /// The identity does not hold the role
    Denied(DenyReason),
}

impl Decision {
    /// Whether the check passed
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Check `identity` against `required`. No side effects.
#[must_use]
pub const fn authorize_role(identity: &Identity, required: Role) -> Decision {
    match identity {
        Identity::Anonymous => Decision::Denied(DenyReason::Unauthenticated),
        Identity::Unknown(id) => Decision::Denied(DenyReason::UnknownUser(*id)),
        Identity::User(user) => {
            if role_matches(user.role, required) {
                Decision::Allowed(*user)
            } else {
                Decision::Denied(DenyReason::WrongRole {
                    required,
                    actual: user.role,
                })
            }
        }
    }
}

const fn role_matches(actual: Role, required: Role) -> bool {
    matches!(
        (actual, required),
        (Role::Organizer, Role::Organizer) | (Role::Attendee, Role::Attendee)
    )
}

/// Proof that a user passed the role check for operation `O`.
///
/// Only [`AuthorizationGuard`] can construct one.
pub struct Grant<O: Operation> {
    user: User,
    _operation: PhantomData<fn() -> O>,
}

impl<O: Operation> Grant<O> {
    /// The authorized user
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Id of the authorized user
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id
    }
}

impl<O: Operation> fmt::Debug for Grant<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grant")
            .field("operation", &O::KIND)
            .field("user", &self.user)
            .finish()
    }
}

/// Issues grants according to an [`AccessPolicy`].
#[derive(Debug, Clone, Default)]
pub struct AuthorizationGuard {
    policy: AccessPolicy,
}

impl AuthorizationGuard {
    /// Create a guard over `policy`
    #[must_use]
    pub const fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }

    /// The policy in force
    #[must_use]
    pub const fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Decide whether `identity` may perform `operation`.
    #[must_use]
    pub fn decide(&self, identity: &Identity, operation: OperationKind) -> Decision {
        match self.policy.required_role(operation) {
            Some(required) => authorize_role(identity, required),
            None => Decision::Denied(DenyReason::NotPermitted),
        }
    }

    /// Authorize `identity` for operation `O`.
    ///
    /// # Errors
    ///
    /// - [`EventPassError::Unauthenticated`] for anonymous callers
    /// - [`EventPassError::NotFound`] (user) when the credential names no user
    /// - [`EventPassError::Forbidden`] for a known user with the wrong role
    pub fn authorize<O: Operation>(&self, identity: &Identity) -> Result<Grant<O>> {
        match self.decide(identity, O::KIND) {
            Decision::Allowed(user) => Ok(Grant {
                user,
                _operation: PhantomData,
            }),
            Decision::Denied(reason) => {
                tracing::warn!(
                    operation = %O::KIND,
                    user_id = ?identity.user_id(),
                    reason = reason.as_str(),
                    "Authorization denied"
                );
                metrics::record_authorization_denied(reason.as_str());
                Err(reason.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn user(role: Role) -> Identity {
        Identity::User(User::new(UserId::new(), role))
    }

    #[test]
    fn default_policy_matches_base_roles() {
        let policy = AccessPolicy::default();
        for op in OperationKind::ALL {
            let expected = if op == OperationKind::Register {
                Role::Attendee
            } else {
                Role::Organizer
            };
            assert_eq!(policy.required_role(op), Some(expected), "{op}");
        }
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        let err = AuthorizationGuard::default()
            .authorize::<ops::Register>(&Identity::Anonymous)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let err = AuthorizationGuard::default()
            .authorize::<ops::CreateEvent>(&Identity::Unknown(UserId::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            EventPassError::NotFound {
                resource: Resource::User,
                ..
            }
        ));
    }

    #[test]
    fn wrong_role_is_forbidden() {
        let guard = AuthorizationGuard::default();
        assert_eq!(
            guard
                .authorize::<ops::CreateEvent>(&user(Role::Attendee))
                .unwrap_err()
                .kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            guard
                .authorize::<ops::Register>(&user(Role::Organizer))
                .unwrap_err()
                .kind(),
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn matching_role_gets_a_grant_for_that_user() {
        let identity = user(Role::Organizer);
        let grant = AuthorizationGuard::default()
            .authorize::<ops::CheckIn>(&identity)
            .unwrap();
        assert_eq!(Some(grant.user_id()), identity.user_id());
    }

    #[test]
    fn missing_table_entry_denies_everyone() {
        let guard = AuthorizationGuard::new(
            AccessPolicy::empty().allow(OperationKind::Register, Role::Attendee),
        );
        assert_eq!(
            guard.decide(&user(Role::Organizer), OperationKind::CheckIn),
            Decision::Denied(DenyReason::NotPermitted)
        );
        assert!(guard.decide(&user(Role::Attendee), OperationKind::Register).is_allowed());
    }

    #[test]
    fn policy_table_is_configurable() {
        let guard = AuthorizationGuard::new(
            AccessPolicy::default().allow(OperationKind::Register, Role::Organizer),
        );
        assert!(guard.authorize::<ops::Register>(&user(Role::Organizer)).is_ok());
        assert!(guard.authorize::<ops::Register>(&user(Role::Attendee)).is_err());
    }

    #[test]
    fn authorize_role_has_no_side_effects() {
        let identity = user(Role::Attendee);
        let first = authorize_role(&identity, Role::Attendee);
        let second = authorize_role(&identity, Role::Attendee);
        assert_eq!(first, second);
        assert!(first.is_allowed());
    }
}
