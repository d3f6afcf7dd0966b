use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use guestlist_shared::error::ServiceError;
use log::{error, info, warn};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{message}: {cause}")]
    Internal { message: String, cause: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound(msg) => {
                warn!("Not found error: {}", msg);
                (StatusCode::NOT_FOUND, json!({ "message": msg }))
            }
            AppError::BadRequest(msg) => {
                warn!("Bad request error: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "message": "Invalid request", "error": msg }),
                )
            }
            AppError::Forbidden(msg) => {
                warn!("Forbidden: {}", msg);
                (StatusCode::FORBIDDEN, json!({ "message": msg }))
            }
            AppError::Conflict(msg) => {
                warn!("Conflict: {}", msg);
                (StatusCode::CONFLICT, json!({ "message": msg }))
            }
            AppError::Internal { message, cause } => {
                error!("{}: {}", message, cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": message, "error": cause }),
                )
            }
        };

        info!("Returning error response: status={}", status);
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Attaches the per-route message a store failure is reported under
pub trait StoreResultExt<T> {
    fn or_fail_with(self, message: &str) -> Result<T>;
}

impl<T> StoreResultExt<T> for guestlist_shared::error::Result<T> {
    fn or_fail_with(self, message: &str) -> Result<T> {
        self.map_err(|err| match err {
            ServiceError::NotFound(detail) => {
                warn!("{}", detail);
                AppError::NotFound("Guest not found".into())
            }
            ServiceError::ValidationError(detail) => AppError::BadRequest(detail),
            ServiceError::Conflict(detail) => AppError::Conflict(detail),
            ServiceError::StoreUnavailable(cause) | ServiceError::Timeout(cause) => {
                AppError::Internal {
                    message: message.to_string(),
                    cause,
                }
            }
        })
    }
}
