//! HTTP error mapping

use crate::auth::AuthError;
use crate::records::RecordError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned to HTTP callers as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MalformedRequest(String),

    #[error("{0}")]
    Auth(AuthError),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::Forbidden) | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl From<RecordError> for ApiError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::NotFound(_) => ApiError::NotFound(e.to_string()),
            RecordError::Forbidden { .. } | RecordError::DeleteForbidden(_) => {
                ApiError::Forbidden(e.to_string())
            }
            RecordError::Invalid(msg) => ApiError::MalformedRequest(msg),
            RecordError::Conflict(msg) => ApiError::Conflict(msg),
            RecordError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::MalformedRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::MalformedRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::MalformedRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{FieldGroup, Role};
    use crate::storage::StorageError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(AuthError::InvalidCredentials).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::Unauthenticated).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::Forbidden).status(), StatusCode::FORBIDDEN);

        let forbidden = RecordError::Forbidden {
            role: Role::Clinician,
            group: FieldGroup::Demographic,
        };
        assert_eq!(ApiError::from(forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(RecordError::NotFound(3)).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(RecordError::Invalid("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RecordError::Conflict("x".into())).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_internal_detail_hidden() {
        let err = ApiError::from(RecordError::Storage(StorageError::Database(
            "password authentication failed for user app".into(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
