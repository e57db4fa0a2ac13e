//! HMAC-SHA256 signed bearer tokens.
//!
//! Format: `base64url(claims_json) "." base64url(hmac_sha256(secret, first_segment))`,
//! both segments unpadded. Claims are `{"sub": <user id>, "exp": <unix seconds>}`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

use super::TokenVerifier;
use crate::environment::Clock;
use crate::error::{EventPassError, Result};
use crate::types::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user the token was issued to
    pub sub: UserId,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

/// Issues and verifies signed bearer tokens.
pub struct SignedTokenVerifier {
    secret: Vec<u8>,
    clock: Arc<dyn Clock>,
    max_ttl: Option<Duration>,
}

impl SignedTokenVerifier {
    /// Create a verifier with a shared secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret.into(),
            clock,
            max_ttl: None,
        }
    }

    /// Reject tokens whose expiry lies more than `max_ttl` in the future.
    #[must_use]
    pub const fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
        self.max_ttl = Some(max_ttl);
        self
    }

    /// Issue a token for `user_id` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the HMAC key cannot be initialised.
    pub fn issue(&self, user_id: UserId, ttl: Duration) -> Result<String> {
        let claims = TokenClaims {
            sub: user_id,
            exp: (self.clock.now() + ttl).timestamp(),
        };
        let body = serde_json::to_vec(&claims)
            .map_err(|e| EventPassError::Storage(format!("failed to encode claims: {e}")))?;
        let body = URL_SAFE_NO_PAD.encode(body);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(body.as_bytes())?);
        Ok(format!("{body}.{signature}"))
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| EventPassError::Storage(format!("invalid token secret: {e}")))?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl TokenVerifier for SignedTokenVerifier {
    fn verify(&self, credential: &str) -> Result<UserId> {
        let (body, signature) = credential
            .trim()
            .split_once('.')
            .ok_or(EventPassError::InvalidCredentials)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| EventPassError::InvalidCredentials)?;
        let expected = self.sign(body.as_bytes())?;
        if !constant_time_eq::constant_time_eq(&signature, &expected) {
            return Err(EventPassError::InvalidCredentials);
        }

        let claims: TokenClaims = URL_SAFE_NO_PAD
            .decode(body)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or(EventPassError::InvalidCredentials)?;

        let now = self.clock.now();
        if claims.exp <= now.timestamp() {
            tracing::debug!(user_id = %claims.sub, "Token expired");
            return Err(EventPassError::InvalidCredentials);
        }
        if let Some(max_ttl) = self.max_ttl {
            if claims.exp > (now + max_ttl).timestamp() {
                tracing::warn!(user_id = %claims.sub, "Token lifetime exceeds the maximum");
                return Err(EventPassError::InvalidCredentials);
            }
        }

        Ok(claims.sub)
    }
}

impl std::fmt::Debug for SignedTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedTokenVerifier")
            .field("secret", &"<redacted>")
            .field("max_ttl", &self.max_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    struct At(DateTime<Utc>);

    impl Clock for At {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn verifier_at(at: DateTime<Utc>) -> SignedTokenVerifier {
        SignedTokenVerifier::new("test-secret", Arc::new(At(at)))
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn issued_token_verifies() {
        let verifier = verifier_at(epoch());
        let user = UserId::new();
        let token = verifier.issue(user, Duration::hours(1)).unwrap();
        assert_eq!(verifier.verify(&token).unwrap(), user);
    }

    #[test]
    fn expired_token_is_rejected() {
        let user = UserId::new();
        let token = verifier_at(epoch()).issue(user, Duration::hours(1)).unwrap();
        let later = verifier_at(epoch() + Duration::hours(2));
        assert_eq!(later.verify(&token).unwrap_err(), EventPassError::InvalidCredentials);
    }

    #[test]
    fn lifetime_above_the_maximum_is_rejected() {
        let verifier = verifier_at(epoch()).with_max_ttl(Duration::days(7));
        let user = UserId::new();

        let week = verifier.issue(user, Duration::days(7)).unwrap();
        let year = verifier.issue(user, Duration::days(365)).unwrap();

        assert_eq!(verifier.verify(&week).unwrap(), user);
        assert_eq!(verifier.verify(&year).unwrap_err(), EventPassError::InvalidCredentials);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let user = UserId::new();
        let token = SignedTokenVerifier::new("other", Arc::new(At(epoch())))
            .issue(user, Duration::hours(1))
            .unwrap();
        assert!(verifier_at(epoch()).verify(&token).is_err());
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let verifier = verifier_at(epoch());
        let token = verifier.issue(UserId::new(), Duration::hours(1)).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&TokenClaims {
                sub: UserId::new(),
                exp: i64::MAX,
            })
            .unwrap(),
        );
        assert!(verifier.verify(&format!("{forged_claims}.{signature}")).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let verifier = verifier_at(epoch());
        for token in ["", "abc", "a.b", "....", "not-base64!.x"] {
            assert_eq!(
                verifier.verify(token).unwrap_err(),
                EventPassError::InvalidCredentials,
                "{token:?}"
            );
        }
    }
}
