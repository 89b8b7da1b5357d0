use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum CustomError {
    #[error("{0}")]
    BadRequestError(String),

    #[error("{0}")]
    ConflictError(String),

    #[error("{0}")]
    InternalServerError(String),

    #[error("{0}")]
    UnauthenticatedError(String),

    #[error("{0}")]
    ForbiddenError(String),

    #[error("{0}")]
    NotFoundError(String),

    #[error("{0}")]
    ValidationError(String),

    /// Credentials were correct but the email address is still unverified.
    #[error("Your email address has not been verified yet")]
    VerificationRequired,
}

impl CustomError {
    fn code(&self) -> &'static str {
        match self {
            CustomError::BadRequestError(..) => "BAD_REQUEST_ERROR",
            CustomError::ConflictError(..) => "CONFLICT_ERROR",
            CustomError::InternalServerError(..) => "INTERNAL_SERVER_ERROR",
            CustomError::UnauthenticatedError(..) => "UNAUTHENTICATED_ERROR",
            CustomError::ForbiddenError(..) => "FORBIDDEN_ERROR",
            CustomError::NotFoundError(..) => "NOT_FOUND_ERROR",
            CustomError::ValidationError(..) => "VALIDATION_ERROR",
            CustomError::VerificationRequired => "VERIFICATION_REQUIRED",
        }
    }
}

impl ResponseError for CustomError {
    fn status_code(&self) -> StatusCode {
        match *self {
            CustomError::BadRequestError(..) => StatusCode::BAD_REQUEST,
            // Conflicts are reported as plain client errors with a specific message.
            CustomError::ConflictError(..) => StatusCode::BAD_REQUEST,
            CustomError::InternalServerError(..) => StatusCode::INTERNAL_SERVER_ERROR,
            CustomError::UnauthenticatedError(..) => StatusCode::UNAUTHORIZED,
            CustomError::ForbiddenError(..) => StatusCode::FORBIDDEN,
            CustomError::NotFoundError(..) => StatusCode::NOT_FOUND,
            CustomError::ValidationError(..) => StatusCode::BAD_REQUEST,
            CustomError::VerificationRequired => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            CustomError::InternalServerError(detail) => {
                log::error!("Internal server error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "success": false,
            "error": message,
            "code": self.code(),
            "httpStatusCode": self.status_code().as_u16(),
        });

        if let CustomError::VerificationRequired = self {
            body["requiresVerification"] = json!(true);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for CustomError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(msg) => CustomError::ConflictError(msg),
            StoreError::Backend(msg) => CustomError::InternalServerError(msg),
        }
    }
}
