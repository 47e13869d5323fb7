use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use roster::{FormError, RemoteError, Role};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Please log in")]
    Unauthorized,

    #[error("Only a {} can do that", .0.as_str())]
    Forbidden(Role),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Invalid(#[from] FormError),

    #[error("{0}")]
    Refused(String),

    #[error("Unable to load leaderboard")]
    RosterUnavailable,

    #[error("Backend error: {0}")]
    Upstream(String),
}

impl From<RemoteError> for AppError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Unauthorized => AppError::Unauthorized,
            RemoteError::InvalidCredentials => AppError::InvalidCredentials,
            RemoteError::Rejected { message, .. } => AppError::Refused(message),
            RemoteError::Malformed(message) => AppError::Upstream(message),
            RemoteError::Transport(e) => AppError::Upstream(e.to_string()),
            RemoteError::InvalidServerUrl(url) => AppError::Upstream(url),
        }
    }
}

impl AppError {
    /// Roster failures collapse into one generic message, auth failures stay distinct.
    pub fn roster(e: RemoteError) -> Self {
        match e {
            RemoteError::Unauthorized => AppError::Unauthorized,
            e => {
                warn!("Roster fetch failed: {e}");
                AppError::RosterUnavailable
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Invalid { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Refused { .. } => StatusCode::CONFLICT,
            AppError::RosterUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
