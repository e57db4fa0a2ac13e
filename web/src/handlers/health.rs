//! Health check endpoints.
//!
//! Used by load balancers and orchestrators.

use axum::{extract::State, http::StatusCode, Json};
use eventpass_core::repository::EventRepository;
use serde::Serialize;

use crate::state::AppState;

/// Readiness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    /// `ready` or `unavailable`
    pub status: &'static str,
}

/// Liveness: 200 whenever the process serves requests.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness: 200 when storage answers, 503 otherwise.
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness<R, D>(State(state): State<AppState<R, D>>) -> (StatusCode, Json<Readiness>)
where
    R: EventRepository + 'static,
    D: Send + Sync + 'static,
{
    match state.repository.ping().await {
        Ok(()) => (StatusCode::OK, Json(Readiness { status: "ready" })),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "unavailable",
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
