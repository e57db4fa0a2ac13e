//! Event endpoints.
//!
//! ```text
//! POST   /api/events                      create (organizer)
//! GET    /api/events                      list (anyone; private events need a user)
//! GET    /api/events/:id                  get
//! PUT    /api/events/:id                  update (owner)
//! DELETE /api/events/:id                  delete (owner)
//! GET    /api/events/:id/registrations    roster (owner)
//! ```

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use eventpass_core::authz::ops;
use eventpass_core::catalog::{EventPatch, EventQuery, NewEvent};
use eventpass_core::identity::UserDirectory;
use eventpass_core::repository::EventRepository;
use eventpass_core::types::RegistrationRecord;

use super::parse_event_id;
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiQuery, Authenticated, CurrentIdentity};
use crate::state::AppState;
use crate::views::{EventView, MessageView};
use crate::WebResult;

/// Publish an event.
///
/// # Errors
///
/// 401 without a credential, 403 for attendees, then 400 for an invalid
/// body or invalid fields.
pub async fn create<R, D>(
    State(state): State<AppState<R, D>>,
    Authenticated(identity): Authenticated,
    body: Result<ApiJson<NewEvent>, AppError>,
) -> WebResult<(StatusCode, Json<EventView>)>
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    let grant = state.guard.authorize::<ops::CreateEvent>(&identity)?;
    let ApiJson(new) = body?;
    let event = state.catalog.create(&grant, new).await?;
    Ok((StatusCode::CREATED, Json(event.into())))
}

/// List events visible to the caller.
///
/// # Errors
///
/// 400 for an unparsable `date` or `visibility` filter.
pub async fn list<R, D>(
    State(state): State<AppState<R, D>>,
    CurrentIdentity(viewer): CurrentIdentity,
    ApiQuery(query): ApiQuery<EventQuery>,
) -> WebResult<Json<Vec<EventView>>>
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    let events = state.catalog.query(&viewer, &query).await?;
    Ok(Json(events.into_iter().map(EventView::from).collect()))
}

/// Fetch one event.
///
/// # Errors
///
/// 404 if the event does not exist or is private and the caller is anonymous.
pub async fn get<R, D>(
    State(state): State<AppState<R, D>>,
    CurrentIdentity(viewer): CurrentIdentity,
    Path(id): Path<String>,
) -> WebResult<Json<EventView>>
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    let id = parse_event_id(&id)?;
    let event = state.catalog.get(&viewer, id).await?;
    Ok(Json(event.into()))
}

/// Apply a partial update.
///
/// # Errors
///
/// 404 for a missing event, then 403 for a non-owner, then 400 for an
/// invalid body or invalid fields; 409 if the event changed concurrently.
pub async fn update<R, D>(
    State(state): State<AppState<R, D>>,
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
    body: Result<ApiJson<EventPatch>, AppError>,
) -> WebResult<Json<EventView>>
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    let id = parse_event_id(&id)?;
    let grant = state.guard.authorize::<ops::UpdateEvent>(&identity)?;
    state.catalog.load_owned(&grant, id).await?;
    let ApiJson(patch) = body?;
    let event = state.catalog.update(&grant, id, patch).await?;
    Ok(Json(event.into()))
}

/// Delete an event with its registrations.
///
/// # Errors
///
/// 404 for a missing event, 403 for a non-owner.
pub async fn delete<R, D>(
    State(state): State<AppState<R, D>>,
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
) -> WebResult<Json<MessageView>>
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    let id = parse_event_id(&id)?;
    let grant = state.guard.authorize::<ops::DeleteEvent>(&identity)?;
    state.catalog.delete(&grant, id).await?;
    Ok(Json(MessageView {
        message: "Event deleted successfully",
    }))
}

/// Registrations of an owned event, with attendance timestamps.
///
/// # Errors
///
/// 404 for a missing event, 403 for a non-owner.
pub async fn roster<R, D>(
    State(state): State<AppState<R, D>>,
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
) -> WebResult<Json<Vec<RegistrationRecord>>>
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    let id = parse_event_id(&id)?;
    let grant = state.guard.authorize::<ops::ViewRoster>(&identity)?;
    Ok(Json(state.catalog.roster(&grant, id).await?))
}
