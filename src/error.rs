use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::repo::RepoError;

/// Failures of core forum operations. Every one is scoped to the request that hit it.
#[derive(thiserror::Error, Debug)]
pub enum ForumError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("you need at least {required} reputation to vote (have {actual})")]
    InsufficientReputation { required: i64, actual: i64 },
    #[error("you have already voted this way")]
    NoOpVote,
    #[error("{0} already in use")]
    DuplicateName(String),
    #[error("operation stopped part way: {0}")]
    PartialCascadeFailure(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("invalid email or password")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("store error: {0}")]
    Store(String),
}

pub type ForumResult<T> = Result<T, ForumError>;

impl From<RepoError> for ForumError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ForumError::NotFound("document"),
            RepoError::Conflict(what) => ForumError::DuplicateName(what),
            RepoError::Internal(msg) => ForumError::Store(msg),
        }
    }
}

impl ForumError {
    /// Maps a store miss onto a named entity, passing other failures through.
    pub fn missing(what: &'static str) -> impl Fn(RepoError) -> ForumError {
        move |e| match e {
            RepoError::NotFound => ForumError::NotFound(what),
            other => other.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] NotFound(String),
    #[error("{0}")] BadRequest(String),
    #[error("{0}")] Unauthorized(String),
    #[error("{0}")] Forbidden(String),
    #[error("{0}")] Conflict(String),
    #[error("too many requests")] TooManyRequests,
    #[error("internal error")] Internal,
}

impl From<ForumError> for ApiError {
    fn from(e: ForumError) -> Self {
        let msg = e.to_string();
        match e {
            ForumError::NotFound(_) => ApiError::NotFound(msg),
            ForumError::Validation(_) | ForumError::NoOpVote => ApiError::BadRequest(msg),
            ForumError::Unauthorized => ApiError::Unauthorized(msg),
            ForumError::InsufficientReputation { .. } | ForumError::Forbidden => ApiError::Forbidden(msg),
            ForumError::DuplicateName(_) => ApiError::Conflict(msg),
            ForumError::PartialCascadeFailure(_) | ForumError::Store(_) => {
                tracing::error!(error = %msg, "request failed in store");
                ApiError::Internal
            }
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        ForumError::from(e).into()
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string() })
    }
}
