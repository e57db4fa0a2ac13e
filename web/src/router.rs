//! Route table.

use axum::{
    routing::{get, post},
    Router,
};
use eventpass_core::identity::UserDirectory;
use eventpass_core::repository::EventRepository;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{check_ins, events, health, identity, registrations};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;

/// Build the application router.
///
/// ```text
/// GET    /health
/// GET    /ready
/// GET    /api/auth/me
/// POST   /api/events
/// GET    /api/events
/// GET    /api/events/:id
/// PUT    /api/events/:id
/// DELETE /api/events/:id
/// POST   /api/events/:id/registrations
/// GET    /api/events/:id/registrations
/// POST   /api/check-ins
/// ```
pub fn build_router<R, D>(state: AppState<R, D>) -> Router
where
    R: EventRepository + 'static,
    D: UserDirectory + 'static,
{
    let api = Router::new()
        .route("/auth/me", get(identity::me))
        .route(
            "/events",
            post(events::create::<R, D>).get(events::list::<R, D>),
        )
        .route(
            "/events/:id",
            get(events::get::<R, D>)
                .put(events::update::<R, D>)
                .delete(events::delete::<R, D>),
        )
        .route(
            "/events/:id/registrations",
            post(registrations::register::<R, D>).get(events::roster::<R, D>),
        )
        .route("/check-ins", post(check_ins::check_in::<R, D>));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness::<R, D>))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
