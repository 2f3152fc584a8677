//! Error taxonomy and the stable error envelope shared by all LearnHub services.
//!
//! Every failure leaving a service is one of the variants below, rendered as
//! `{timestamp, status, message, path, errors[]}` by the [`ErrorEnvelope`]
//! middleware. Peer/network failures are re-classified at the service boundary;
//! raw transport errors never reach clients.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

mod envelope;

pub use envelope::ErrorEnvelope;

/// Result type used by handlers and services.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// One invalid field in a request body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldErrorItem {
    pub field: String,
    pub message: String,
}

/// Application error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, invalid or expired credential
    #[error("{0}")]
    Unauthorized(String),

    /// Valid credential, insufficient ownership or role
    #[error("{0}")]
    Forbidden(String),

    /// Resource or peer resource absent
    #[error("{0}")]
    NotFound(String),

    /// Duplicate enrollment, invalid state transition, and the like
    #[error("{0}")]
    Conflict(String),

    /// Malformed input
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldErrorItem>,
    },

    /// Peer unreachable or timed out. Always surfaced, never collapsed into
    /// Forbidden or success.
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// Anything unexpected. The inner message is for logs only.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::Validation {
            message: "Validation failed".to_string(),
            errors: vec![FieldErrorItem {
                field: field.into(),
                message,
            }],
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ApiError::UpstreamUnavailable(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Message safe to return to clients. Internal details are replaced.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Unexpected error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn field_errors(&self) -> Vec<FieldErrorItem> {
        match self {
            ApiError::Validation { errors, .. } => errors.clone(),
            _ => Vec::new(),
        }
    }
}

/// True when the database rejected an insert on a unique constraint
/// (Postgres SQLSTATE 23505). Used to turn lost races into Conflict.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("database error: {err}"))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let items = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldErrorItem {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        ApiError::Validation {
            message: "Validation failed".to_string(),
            errors: items,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Fallback rendering without a request path; the ErrorEnvelope middleware
    // normally rebuilds the body with the path filled in.
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorBody::new(
            status.as_u16(),
            self.public_message(),
            String::new(),
            self.field_errors(),
        ))
    }
}

/// The stable envelope every failing request returns.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub message: String,
    pub path: String,
    pub errors: Vec<FieldErrorItem>,
}

impl ErrorBody {
    pub fn new(status: u16, message: String, path: String, errors: Vec<FieldErrorItem>) -> Self {
        Self {
            timestamp: Utc::now(),
            status,
            message,
            path,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::upstream("x").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = ApiError::internal("connection refused to 10.0.0.3:5432");
        assert_eq!(err.public_message(), "Unexpected error");

        let err: ApiError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.public_message(), "Unexpected error");
    }

    #[test]
    fn envelope_field_names_are_stable() {
        let body = ErrorBody::new(
            409,
            "Already enrolled".to_string(),
            "/api/enrollments".to_string(),
            vec![],
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], 409);
        assert_eq!(json["message"], "Already enrolled");
        assert_eq!(json["path"], "/api/enrollments");
        assert!(json["errors"].as_array().unwrap().is_empty());
        assert!(json["timestamp"].is_string());
    }

    #[derive(Debug)]
    struct StubDbError(&'static str);

    impl std::fmt::Display for StubDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "database rejected the statement")
        }
    }

    impl std::error::Error for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "database rejected the statement"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.0 {
                "23505" => sqlx::error::ErrorKind::UniqueViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn unique_violation_is_detected_by_sqlstate() {
        let unique = sqlx::Error::Database(Box::new(StubDbError("23505")));
        assert!(is_unique_violation(&unique));

        let foreign_key = sqlx::Error::Database(Box::new(StubDbError("23503")));
        assert!(!is_unique_violation(&foreign_key));

        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 3, message = "must be at least 3 characters"))]
        name: String,
    }

    #[test]
    fn validator_errors_become_field_items() {
        let probe = Probe { name: "ab".to_string() };
        let err: ApiError = probe.validate().unwrap_err().into();

        match &err {
            ApiError::Validation { message, errors } => {
                assert_eq!(message, "Validation failed");
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "name");
                assert_eq!(errors[0].message, "must be at least 3 characters");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
