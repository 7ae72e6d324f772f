use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use model::errors::RewardsError;
use serde_json::json;

/// Domain errors mapped to HTTP in one place. Internal errors are logged
/// with their chain and returned as an opaque 500.
pub struct ApiError(RewardsError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            RewardsError::UserNotFound(_)
            | RewardsError::CategoryNotFound(_)
            | RewardsError::RequestNotFound(_)
            | RewardsError::AttachmentNotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            RewardsError::RequestAlreadyProcessed(_) => {
                (StatusCode::CONFLICT, self.0.to_string())
            }
            RewardsError::NotEligible(_)
            | RewardsError::BonusLimitExceeded { .. }
            | RewardsError::InvalidInput(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            RewardsError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            RewardsError::AccessDenied => (StatusCode::FORBIDDEN, "Not authorized".to_string()),
            RewardsError::Common(_) | RewardsError::Mongo(_) => {
                error!("Internal error: {:#}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<RewardsError> for ApiError {
    fn from(err: RewardsError) -> Self {
        ApiError(err)
    }
}

impl From<eyre::Error> for ApiError {
    fn from(err: eyre::Error) -> Self {
        ApiError(RewardsError::Common(err))
    }
}

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        ApiError(RewardsError::Mongo(err))
    }
}

pub fn access_denied() -> ApiError {
    ApiError(RewardsError::AccessDenied)
}

pub fn invalid_input(message: impl Into<String>) -> ApiError {
    ApiError(RewardsError::InvalidInput(message.into()))
}
