use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::nutrition::InvalidQuantity;

/// Crate-wide request error taxonomy. Handlers resolve resource identity
/// before evaluating permissions, so NotFound and Forbidden never get
/// conflated in a response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("access denied")]
    Forbidden,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(err) => {
                error!(error = %err, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<InvalidQuantity> for ApiError {
    fn from(err: InvalidQuantity) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_statuses() {
        assert_eq!(ApiError::NotFound("meal entry").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Unauthorized("missing token").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::invalid("bad quantity").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("food in use".into()).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(ApiError::NotFound("meal entry").to_string(), "meal entry not found");
    }

    #[test]
    fn invalid_quantity_converts_to_invalid_input() {
        let err: ApiError = InvalidQuantity(-10.0).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
