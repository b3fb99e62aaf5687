//! Tutor presence views: list and lookup.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::ProfListResponse;
use crate::app_state::AppState;
use crate::domain::TutorPresence;
use crate::error::{ErrorResponse, HubError};

/// `GET /profs` — Current presence snapshot.
#[utoipa::path(
    get,
    path = "/api/v1/profs",
    tag = "Presence",
    summary = "List connected tutors",
    description = "Returns the same snapshot the hub broadcasts as `profList`, sorted by username.",
    responses(
        (status = 200, description = "Presence snapshot", body = ProfListResponse),
    )
)]
pub async fn list_profs(State(state): State<AppState>) -> impl IntoResponse {
    Json(ProfListResponse::from(state.hub.snapshot().await))
}

/// `GET /profs/{username}` — Presence of one tutor.
///
/// # Errors
///
/// Returns [`HubError::TutorNotFound`] if the tutor is not connected.
#[utoipa::path(
    get,
    path = "/api/v1/profs/{username}",
    tag = "Presence",
    summary = "Get one tutor",
    description = "Returns availability and pending-call count for a connected tutor.",
    params(
        ("username" = String, Path, description = "Tutor username"),
    ),
    responses(
        (status = 200, description = "Tutor presence", body = TutorPresence),
        (status = 404, description = "Tutor not connected", body = ErrorResponse),
    )
)]
pub async fn get_prof(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<TutorPresence>, HubError> {
    state
        .hub
        .tutor(&username)
        .await
        .map(Json)
        .ok_or(HubError::TutorNotFound(username))
}

/// Presence routes, nested under `/api/v1` by the caller.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profs", get(list_profs))
        .route("/profs/{username}", get(get_prof))
}
