use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::jwt::TokenError;
use crate::users::store::StoreError;

/// Every failure a request can surface. Handlers and services return this;
/// the `IntoResponse` impl is the only place status codes and error bodies
/// are produced.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("invalid email address or password")]
    Authentication,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("store failure")]
    Store(#[source] sqlx::Error),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Authentication | ApiError::Token(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => ApiError::Conflict(format!("{field} already taken")),
            StoreError::Database(e) => ApiError::Store(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Server faults are logged with their source and answered with a
        // generic body; internal error text never reaches the client.
        let message = if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (
            status,
            Json(json!({ "status": "error", "message": message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::store::UniqueField;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("taken".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::Authentication.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Token(TokenError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::NotFound("user").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_store_error_becomes_scoped_conflict() {
        let err = ApiError::from(StoreError::Duplicate {
            field: UniqueField::Username,
        });
        match err {
            ApiError::Conflict(msg) => assert_eq!(msg, "username already taken"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn internal_errors_never_leak_source_text() {
        let response =
            ApiError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
