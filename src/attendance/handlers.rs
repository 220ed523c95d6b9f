use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::controller::SessionUiState;
use super::dto::{LocationRequest, LogResponse, StartWorkRequest};
use super::model::AttendanceRecord;
use crate::{auth::extractors::AuthSession, state::AppState};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance/session", get(get_session))
        .route("/attendance/log", get(get_log))
        .route("/attendance/records", get(list_records))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance/start", post(start_work))
        .route("/attendance/end", post(end_work))
        .route("/attendance/location", put(save_location))
}

// --- handlers ---

#[instrument(skip(state, session), fields(user_id = %session.identity.id))]
pub async fn get_session(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<SessionUiState>, (StatusCode, String)> {
    Ok(Json(state.attendance.state(&session.identity).await?))
}

/// POST /attendance/start, optional body `{ "restaurantName": "..." }`
#[instrument(skip(state, session, body), fields(user_id = %session.identity.id))]
pub async fn start_work(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    body: Option<Json<StartWorkRequest>>,
) -> Result<(StatusCode, Json<SessionUiState>), (StatusCode, String)> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let started = state
        .attendance
        .start_work(&session.identity, body.restaurant_name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

#[instrument(skip(state, session), fields(user_id = %session.identity.id))]
pub async fn end_work(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<AttendanceRecord>, (StatusCode, String)> {
    Ok(Json(state.attendance.end_work(&session.identity).await?))
}

#[instrument(skip(state, session), fields(user_id = %session.identity.id))]
pub async fn get_log(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<LogResponse>, (StatusCode, String)> {
    let log = state.attendance.load_log(&session.identity).await?;
    Ok(Json(LogResponse {
        entries: log.entries().collect(),
        total_hours: log.total_hours(),
        rounding: state.attendance.rounding(),
    }))
}

/// Records in their persisted shape, oldest first.
#[instrument(skip(state, session), fields(user_id = %session.identity.id))]
pub async fn list_records(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Vec<AttendanceRecord>>, (StatusCode, String)> {
    let log = state.attendance.load_log(&session.identity).await?;
    Ok(Json(log.into_records()))
}

#[instrument(skip(state, session, body), fields(user_id = %session.identity.id))]
pub async fn save_location(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(body): Json<LocationRequest>,
) -> Result<Json<SessionUiState>, (StatusCode, String)> {
    Ok(Json(
        state
            .attendance
            .save_location(&session.identity, &body.restaurant_name)
            .await?,
    ))
}
