//! Identity resolution.
//!
//! Turns an opaque bearer credential into an [`Identity`]. Verification of
//! the credential is delegated to a [`TokenVerifier`]; the user record comes
//! from a read-only [`UserDirectory`].

mod token;

pub use token::{SignedTokenVerifier, TokenClaims};

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{Role, User, UserId};

/// Verifies a bearer credential and yields the user id it was issued to.
pub trait TokenVerifier: Send + Sync {
    /// Verify `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventPassError::InvalidCredentials`] when the
    /// credential is malformed, forged or expired.
    fn verify(&self, credential: &str) -> Result<UserId>;
}

/// Read-only access to the external identity store.
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventPassError::Storage`] if the store is unreachable.
    fn find_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>>> + Send;
}

/// Who is making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// No credential supplied
    Anonymous,
    /// Valid credential whose user no longer exists in the directory
    Unknown(UserId),
    /// Known user
    User(User),
}

impl Identity {
    /// Role of a known user
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match self {
            Self::User(user) => Some(user.role),
            Self::Anonymous | Self::Unknown(_) => None,
        }
    }

    /// User id carried by the credential, if any
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(user) => Some(user.id),
            Self::Unknown(id) => Some(*id),
            Self::Anonymous => None,
        }
    }

    /// The known user, if any
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            Self::Anonymous | Self::Unknown(_) => None,
        }
    }

    /// Whether this viewer may see private events.
    ///
    /// Only signed-in organizers and attendees qualify; anonymous callers and
    /// credentials without a user record are limited to public events.
    #[must_use]
    pub const fn sees_private_events(&self) -> bool {
        matches!(self.role(), Some(Role::Organizer | Role::Attendee))
    }
}

/// Resolves credentials into identities.
pub struct IdentityResolver<D> {
    verifier: Arc<dyn TokenVerifier>,
    directory: D,
}

impl<D: UserDirectory> IdentityResolver<D> {
    /// Create a resolver
    pub fn new(verifier: Arc<dyn TokenVerifier>, directory: D) -> Self {
        Self {
            verifier,
            directory,
        }
    }

    /// Resolve an optional bearer credential.
    ///
    /// A missing credential resolves to [`Identity::Anonymous`]. A credential
    /// that verifies but names no user resolves to [`Identity::Unknown`], so
    /// the guard can report the user as not found.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EventPassError::InvalidCredentials`] for a credential
    /// that does not verify, or a storage error from the directory.
    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, credential: Option<&str>) -> Result<Identity> {
        let Some(credential) = credential else {
            return Ok(Identity::Anonymous);
        };

        let user_id = self.verifier.verify(credential).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected bearer credential");
        })?;

        match self.directory.find_user(user_id).await? {
            Some(user) => {
                tracing::debug!(user_id = %user.id, role = %user.role, "Resolved identity");
                Ok(Identity::User(user))
            }
            None => {
                tracing::warn!(user_id = %user_id, "Credential refers to unknown user");
                Ok(Identity::Unknown(user_id))
            }
        }
    }

    /// The directory this resolver reads from
    pub const fn directory(&self) -> &D {
        &self.directory
    }
}

impl<D> std::fmt::Debug for IdentityResolver<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::EventPassError;
    use std::collections::HashMap;

    struct StaticVerifier;

    impl TokenVerifier for StaticVerifier {
        fn verify(&self, credential: &str) -> Result<UserId> {
            credential
                .parse()
                .map_err(|_| EventPassError::InvalidCredentials)
        }
    }

    struct MapDirectory(HashMap<UserId, User>);

    impl UserDirectory for MapDirectory {
        async fn find_user(&self, id: UserId) -> Result<Option<User>> {
            Ok(self.0.get(&id).copied())
        }
    }

    fn resolver(users: &[User]) -> IdentityResolver<MapDirectory> {
        IdentityResolver::new(
            Arc::new(StaticVerifier),
            MapDirectory(users.iter().map(|u| (u.id, *u)).collect()),
        )
    }

    #[tokio::test]
    async fn missing_credential_is_anonymous() {
        let identity = resolver(&[]).resolve(None).await.unwrap();
        assert_eq!(identity, Identity::Anonymous);
        assert!(!identity.sees_private_events());
    }

    #[tokio::test]
    async fn known_user_resolves_with_role() {
        let user = User::new(UserId::new(), Role::Attendee);
        let identity = resolver(&[user])
            .resolve(Some(&user.id.to_string()))
            .await
            .unwrap();
        assert_eq!(identity, Identity::User(user));
        assert_eq!(identity.role(), Some(Role::Attendee));
        assert!(identity.sees_private_events());
    }

    #[tokio::test]
    async fn verified_but_unknown_user() {
        let id = UserId::new();
        let identity = resolver(&[]).resolve(Some(&id.to_string())).await.unwrap();
        assert_eq!(identity, Identity::Unknown(id));
        assert_eq!(identity.user_id(), Some(id));
        assert!(!identity.sees_private_events());
    }

    #[tokio::test]
    async fn bad_credential_is_rejected() {
        let err = resolver(&[]).resolve(Some("garbage")).await.unwrap_err();
        assert_eq!(err, EventPassError::InvalidCredentials);
    }
}
