//! `POST /api/events/:id/registrations`

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use eventpass_core::authz::ops;
use eventpass_core::identity::UserDirectory;
use eventpass_core::repository::EventRepository;
use serde::Deserialize;

use super::parse_event_id;
use crate::error::AppError;
use crate::extractors::Authenticated;
use crate::state::AppState;
use crate::views::RegistrationView;
use crate::WebResult;

/// Optional registration body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    /// Tier to consume a ticket from
    #[serde(default)]
    pub tier: Option<String>,
}

impl RegisterRequest {
    /// Parse a possibly empty body.
    fn from_body(body: &[u8]) -> WebResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| AppError::validation(format!("Invalid body: {e}")))
    }
}

/// Register the caller for an event.
///
/// The body is optional; `{"tier": "VIP"}` consumes a ticket of that tier.
///
/// # Errors
///
/// 401 without a credential, 403 for organizers, 404 for a missing event,
/// 409 if already registered or the tier is sold out.
pub async fn register<R, D>(
    State(state): State<AppState<R, D>>,
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
    body: Bytes,
) -> WebResult<(StatusCode, Json<RegistrationView>)>
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    let id = parse_event_id(&id)?;
    let grant = state.guard.authorize::<ops::Register>(&identity)?;
    let request = RegisterRequest::from_body(&body)?;

    let confirmation = state
        .registrations
        .register(&grant, id, request.tier.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(confirmation.into())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_means_no_tier() {
        assert!(RegisterRequest::from_body(b"").unwrap().tier.is_none());
        assert!(RegisterRequest::from_body(b"  \n").unwrap().tier.is_none());
        assert!(RegisterRequest::from_body(b"{}").unwrap().tier.is_none());
    }

    #[test]
    fn tier_is_read() {
        let request = RegisterRequest::from_body(br#"{"tier":"VIP"}"#).unwrap();
        assert_eq!(request.tier.as_deref(), Some("VIP"));
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let err = RegisterRequest::from_body(b"{tier").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
