//! `GET /api/auth/me`

use axum::Json;
use eventpass_core::error::{EventPassError, Resource};
use eventpass_core::identity::Identity;
use eventpass_core::types::User;

use crate::extractors::Authenticated;
use crate::WebResult;

/// The user behind the caller's credential.
///
/// # Errors
///
/// 401 without a valid credential, 404 if the credential names no user.
#[allow(clippy::unused_async)]
pub async fn me(Authenticated(identity): Authenticated) -> WebResult<Json<User>> {
    match identity {
        Identity::User(user) => Ok(Json(user)),
        Identity::Unknown(id) => Err(EventPassError::not_found(Resource::User, id).into()),
        Identity::Anonymous => Err(EventPassError::Unauthenticated.into()),
    }
}
