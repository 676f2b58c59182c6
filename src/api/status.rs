use axum::{ extract::{ Query, State }, http::StatusCode, Json };
use serde::{ Deserialize, Serialize };

use crate::services::SystemStatusSnapshot;

use super::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: SystemStatusSnapshot,
    pub refreshing: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.status_service.read_snapshot().await;

    Json(StatusResponse {
        snapshot: snapshot.as_ref().clone(),
        refreshing: state.status_service.is_refreshing(),
    })
}

#[derive(Deserialize)]
pub struct RefreshQuery {
    /// `false` queues the refresh on the background loop instead of waiting.
    #[serde(default = "default_wait")]
    pub wait: bool,
}

fn default_wait() -> bool {
    true
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub queued: bool,
}

pub async fn refresh_status(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>
) -> (StatusCode, Json<RefreshResponse>) {
    if !query.wait {
        state.status_service.request_refresh();
        return (StatusCode::ACCEPTED, Json(RefreshResponse { success: true, queued: true }));
    }

    let success = state.status_service.refresh_now().await;
    let code = if success { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (code, Json(RefreshResponse { success, queued: false }))
}
