use axum::http::StatusCode;
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the auth services and the session controller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    UserExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Work session already in progress")]
    AlreadyWorking,

    #[error("No active work session")]
    NoActiveSession,

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UserExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::AlreadyWorking | AppError::NoActiveSession => StatusCode::CONFLICT,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AppError> for (StatusCode, String) {
    fn from(e: AppError) -> Self {
        let status = e.status();
        match e {
            AppError::Store(inner) => {
                error!(error = %format!("{inner:#}"), "store operation failed");
                (status, "Storage unavailable, please try again".into())
            }
            other => (status, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::UserExists.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NoActiveSession.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::AlreadyWorking.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn store_errors_hide_backend_detail() {
        let (status, msg) = <(StatusCode, String)>::from(AppError::Store(anyhow::anyhow!(
            "connection refused to 10.0.0.1"
        )));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!msg.contains("10.0.0.1"));
    }
}
