use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, CredentialsRequest, PublicUser, RefreshRequest},
        extractors::AuthSession,
        jwt::JwtKeys,
        repo_types::Identity,
        services,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Opens a session for `identity` and signs its token pair.
async fn issue(state: &AppState, identity: Identity) -> Result<AuthResponse, (StatusCode, String)> {
    let session = state.sessions.open(identity).await;
    let (access_token, refresh_token) = JwtKeys::from_ref(state)
        .sign_pair(&session)
        .map_err(|e| {
            error!(error = %e, "jwt sign failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: session.identity.id,
            email: session.identity.email,
        },
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    let identity =
        services::register(state.users.as_ref(), &payload.email, &payload.password).await?;
    let resp = issue(&state, identity).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let identity =
        services::authenticate(state.users.as_ref(), &payload.email, &payload.password).await?;
    let resp = issue(&state, identity).await?;
    info!(user_id = %resp.user.id, "user logged in");
    Ok(Json(resp))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let Some(session) = state.sessions.touch(claims.sid).await else {
        warn!(session_id = %claims.sid, "refresh for closed session");
        return Err((StatusCode::UNAUTHORIZED, "Session has ended".into()));
    };

    // Issue new pair for the same session
    let (access_token, refresh_token) = keys
        .sign_pair(&session)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: session.identity.id,
            email: session.identity.email,
        },
    }))
}

#[instrument(skip(state, session), fields(session_id = %session.id))]
pub async fn logout(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> StatusCode {
    if let Some((ctx, 0)) = state.sessions.close(session.id).await {
        state.attendance.forget(&ctx.identity).await;
    }
    let session_secs = (time::OffsetDateTime::now_utc() - session.created_at).whole_seconds();
    info!(user_id = %session.identity.id, session_secs, "user logged out");
    StatusCode::NO_CONTENT
}

#[instrument(skip(state, session))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state
        .users
        .find_by_id(session.identity.id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %session.identity.id, "user lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "User lookup failed".to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
    }))
}
