//! Custom Axum extractors.
//!
//! - [`BearerToken`]: the raw credential from `Authorization: Bearer …`, if any
//! - [`CurrentIdentity`]: the resolved caller, anonymous when no credential
//! - [`Authenticated`]: the resolved caller, credential required
//! - [`ApiJson`] / [`ApiQuery`]: `Json` and `Query` with [`AppError`] rejections

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use eventpass_core::error::EventPassError;
use eventpass_core::identity::{Identity, UserDirectory};
use eventpass_core::repository::EventRepository;

use crate::error::AppError;
use crate::state::AppState;

/// JSON body whose rejection is a 400 `VALIDATION_ERROR`.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejection is a 400 `VALIDATION_ERROR`.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Bearer credential, if the request carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    /// Read the `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`EventPassError::InvalidCredentials`] if the header is present
    /// but is not a well-formed bearer credential.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, EventPassError> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(Self(None));
        };

        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(EventPassError::InvalidCredentials)?;

        Ok(Self(Some(token.to_owned())))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers)?)
    }
}

/// The caller, or [`Identity::Anonymous`] without a credential.
///
/// Used by read endpoints, where anonymous viewers see public events.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

#[async_trait]
impl<R, D> FromRequestParts<AppState<R, D>> for CurrentIdentity
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<R, D>,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_headers(&parts.headers)?;
        let identity = state.resolver.resolve(token.as_deref()).await?;
        Ok(Self(identity))
    }
}

/// The caller; rejects requests without a credential with 401.
///
/// The identity may still be [`Identity::Unknown`]; the guard turns that into
/// "User not found".
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

#[async_trait]
impl<R, D> FromRequestParts<AppState<R, D>> for Authenticated
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<R, D>,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_headers(&parts.headers)?;
        let Some(token) = token else {
            return Err(EventPassError::Unauthenticated.into());
        };
        let identity = state.resolver.resolve(Some(&token)).await?;
        Ok(Self(identity))
    }
}
