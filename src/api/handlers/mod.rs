pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod logout;
pub use self::logout::logout;

pub mod user;
pub use self::user::create;

pub mod validate;
pub use self::validate::validate;

// common response shapes and error mapping for the handlers
use crate::session;
use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

pub(crate) fn error_response(
    status: StatusCode,
    message: &str,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Translate an engine error for the wire: narrow status codes, generic
/// bodies. Internal detail goes to the log with the operation name, never
/// to the caller.
pub(crate) fn engine_error(
    operation: &str,
    err: &session::Error,
) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        session::Error::InvalidCredentials | session::Error::InvalidToken => {
            StatusCode::UNAUTHORIZED
        }
        session::Error::SessionExpired => StatusCode::FORBIDDEN,
        session::Error::NotFound => StatusCode::NOT_FOUND,
        session::Error::Conflict => StatusCode::CONFLICT,
        session::Error::InvalidName | session::Error::InvalidPassword => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        session::Error::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("{operation}: {err}");
        error_response(status, "Internal Server Error")
    } else {
        error_response(status, &err.to_string())
    }
}
