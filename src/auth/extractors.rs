use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::warn;

use super::claims::TokenKind;
use super::jwt::JwtKeys;
use crate::{session::SessionContext, state::AppState};

/// Validates the bearer access token and resolves the live session it
/// belongs to.
pub struct AuthSession(pub SessionContext);

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing Authorization header".to_string()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "Invalid Authorization header".to_string()))?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|_| {
            warn!("invalid or expired token");
            (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
        })?;

        if claims.kind != TokenKind::Access {
            return Err((StatusCode::UNAUTHORIZED, "Access token required".into()));
        }

        match state.sessions.get(claims.sid).await {
            Some(ctx) if ctx.identity.id == claims.sub => Ok(AuthSession(ctx)),
            _ => {
                warn!(session_id = %claims.sid, "token for closed session");
                Err((StatusCode::UNAUTHORIZED, "Session has ended".into()))
            }
        }
    }
}
