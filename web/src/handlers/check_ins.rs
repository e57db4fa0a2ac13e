//! `POST /api/check-ins`

use axum::{extract::State, Json};
use eventpass_core::authz::ops;
use eventpass_core::identity::UserDirectory;
use eventpass_core::repository::EventRepository;
use serde::Deserialize;

use crate::extractors::{ApiJson, Authenticated};
use crate::state::AppState;
use crate::views::CheckInView;
use crate::WebResult;

/// Scanned code, as read by the organizer's scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckInRequest {
    /// The encoded QR payload
    #[serde(alias = "qrData")]
    pub qr_data: String,
}

/// Mark the holder of a scanned code as attended.
///
/// # Errors
///
/// 401 without a credential, 403 for attendees, 400 for an undecodable code,
/// 404 for a missing event, 409 if not registered or already checked in.
pub async fn check_in<R, D>(
    State(state): State<AppState<R, D>>,
    Authenticated(identity): Authenticated,
    ApiJson(request): ApiJson<CheckInRequest>,
) -> WebResult<Json<CheckInView>>
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    let grant = state.guard.authorize::<ops::CheckIn>(&identity)?;
    let receipt = state.scanner.check_in(&grant, &request.qr_data).await?;
    Ok(Json(receipt.into()))
}
