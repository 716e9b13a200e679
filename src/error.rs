// src/error.rs
use std::collections::BTreeMap;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use log::error;
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::repositories::identity_repo::IdentityError;
use crate::repositories::post_repository::RepoError;
use crate::services::rate_limiter::RateLimitError;

pub const UNAUTHORIZED_MESSAGE: &str = "You must be logged in to perform this action.";
pub const TOO_MANY_REQUESTS_MESSAGE: &str = "You are doing that too much. Please try again later.";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error returned by every procedure. The variant decides the status code and the
/// coarse `code` the client sees.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input")]
    Validation { field_errors: BTreeMap<String, Vec<String>> },
    #[error("{0}")]
    BadRequest(String),
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,
    #[error("{}", TOO_MANY_REQUESTS_MESSAGE)]
    TooManyRequests,
    #[error("{0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Message safe to show to the end user. Internal details never leave the process.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// First message recorded for `field`, if this is a validation error.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        match self {
            ApiError::Validation { field_errors } => field_errors
                .get(field)
                .and_then(|msgs| msgs.first())
                .map(String::as_str),
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    code: &'static str,
    message: String,
    http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_errors: Option<&'a BTreeMap<String, Vec<String>>>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if let ApiError::Internal(detail) = self {
            error!("internal error: {}", detail);
        }

        let field_errors = match self {
            ApiError::Validation { field_errors } => Some(field_errors),
            _ => None,
        };

        HttpResponse::build(status).json(ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message: self.public_message(),
                http_status: status.as_u16(),
                field_errors,
            },
        })
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(msg) => msg.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        ApiError::Validation { field_errors }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<RateLimitError> for ApiError {
    fn from(e: RateLimitError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
