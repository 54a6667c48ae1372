//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::Local;

use super::dto::{BoardResponse, ErrorBody, StationBoardResponse};
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/arrivals", get(all_arrivals))
        .route("/api/arrivals/:station", get(station_arrivals))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// The whole board.
async fn all_arrivals(State(state): State<AppState>) -> Json<BoardResponse> {
    let now = Local::now().naive_local();
    let view = state.query.get_all(now).await;
    Json(BoardResponse::from(&view))
}

/// One station's board. The path segment may be a station code or a raw
/// station name.
async fn station_arrivals(
    State(state): State<AppState>,
    Path(station): Path<String>,
) -> Result<Json<StationBoardResponse>, (StatusCode, Json<ErrorBody>)> {
    let now = Local::now().naive_local();

    match state.query.get_by_station(&station, now).await {
        Some(view) => Ok(Json(StationBoardResponse::from(&view))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("unknown station: {station}"),
            }),
        )),
    }
}
