use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Everything a request handler can fail with. Messages are user-facing and
/// surfaced verbatim; none of these are retried server-side.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid or expired voting link")]
    LinkInvalid,

    #[error("Voting link has expired")]
    LinkExpired,

    #[error("Voting is not currently active")]
    VoteNotActive,

    #[error("You have already voted")]
    AlreadyVoted,

    #[error("Failed to create voting link")]
    IssuanceFailed,

    #[error("Email template not found")]
    TemplateNotFound,

    #[error("Member not found")]
    MemberNotFound,

    #[error("Vote not found")]
    VoteNotFound,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::LinkInvalid => StatusCode::NOT_FOUND,
            AppError::LinkExpired => StatusCode::GONE,
            AppError::VoteNotActive
            | AppError::AlreadyVoted
            | AppError::IssuanceFailed
            | AppError::TemplateNotFound
            | AppError::MemberNotFound
            | AppError::VoteNotFound
            | AppError::SendFailed(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
