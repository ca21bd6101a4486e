/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Library errors convert into
/// [`ApiError`] through `From`, so `?` is enough to map them onto the HTTP
/// taxonomy:
///
/// | Variant | Status | `error` code |
/// |---|---|---|
/// | `BadRequest` | 400 | `bad_request` |
/// | `Validation` | 400 | `validation_error` |
/// | `Duplicate` | 400 | `duplicate` |
/// | `InvalidOperation` | 400 | `invalid_operation` |
/// | `Unauthorized` | 401 | `unauthorized` |
/// | `NotFound` | 404 | `not_found` |
/// | `Conflict` | 409 | `conflict` |
/// | `Internal` | 500 | `internal_error` |
///
/// Error bodies share the success envelope:
///
/// ```json
/// { "success": false, "error": "not_found", "message": "Group not found or access denied" }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskflow_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError},
    membership::MembershipError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or incomplete request (400)
    BadRequest(String),

    /// Field-level validation failures (400)
    Validation(Vec<ValidationErrorDetail>),

    /// Something already exists or is already the case (400)
    Duplicate(String),

    /// Request is well-formed but not allowed by the rules (400)
    InvalidOperation(String),

    /// Missing or invalid credentials (401)
    Unauthorized(String),

    /// Not found, or not visible to the requester (404)
    NotFound(String),

    /// Concurrent modification that could not be resolved (409)
    Conflict(String),

    /// Unexpected failure; detail is logged, never returned (500)
    Internal(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,

    /// Machine-readable error code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Per-field validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![ValidationErrorDetail::new(field, message)])
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::Validation(_)
            | ApiError::Duplicate(_)
            | ApiError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation_error",
            ApiError::Duplicate(_) => "duplicate",
            ApiError::InvalidOperation(_) => "invalid_operation",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Validation(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Duplicate(msg) => write!(f, "Duplicate: {}", msg),
            ApiError::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code().to_string();

        let (message, details) = match self {
            ApiError::Validation(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Request validation failed".to_string());
                (message, Some(errors))
            }
            ApiError::Internal(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("Server error".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Duplicate(msg)
            | ApiError::InvalidOperation(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            success: false,
            error,
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("Resource already exists".to_string())
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

/// Malformed JSON bodies become 400s in the standard envelope
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::Validation(details)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

/// Authorization denials are reported as 404 so existence is never disclosed
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl From<MembershipError> for ApiError {
    fn from(err: MembershipError) -> Self {
        let message = err.to_string();
        match err {
            MembershipError::AlreadyMember | MembershipError::AlreadyAdmin => {
                ApiError::Duplicate(message)
            }
            MembershipError::NotMember | MembershipError::MemberNotFound => {
                ApiError::NotFound(message)
            }
            MembershipError::CannotRemoveSelf | MembershipError::LastAdmin => {
                ApiError::InvalidOperation(message)
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(reason) => ApiError::invalid_field("password", reason),
            other => ApiError::Internal(format!("Password operation failed: {}", other)),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::Internal(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::invalid_field("name", "Group name is required");
        assert_eq!(err.to_string(), "Validation failed: 1 errors");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Duplicate(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidOperation(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized(String::new()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound(String::new()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict(String::new()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Internal(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_envelope() {
        let (status, body) = body_json(ApiError::NotFound("Group not found".to_string())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Group not found");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let (status, body) =
            body_json(ApiError::Internal("connection refused on 10.0.0.3".to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server error");
        assert!(!body.to_string().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_validation_message_is_first_detail() {
        let err = ApiError::Validation(vec![
            ValidationErrorDetail::new("name", "Group name is required"),
            ValidationErrorDetail::new("description", "Description too long"),
        ]);
        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "Group name is required");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_membership_error_mapping() {
        assert!(matches!(
            ApiError::from(MembershipError::AlreadyMember),
            ApiError::Duplicate(_)
        ));
        assert!(matches!(
            ApiError::from(MembershipError::AlreadyAdmin),
            ApiError::Duplicate(_)
        ));
        assert!(matches!(
            ApiError::from(MembershipError::MemberNotFound),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(MembershipError::CannotRemoveSelf),
            ApiError::InvalidOperation(_)
        ));

        match ApiError::from(MembershipError::LastAdmin) {
            ApiError::InvalidOperation(msg) => assert!(msg.contains("only admin")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_authz_error_is_not_found() {
        match ApiError::from(AuthzError::NotAdmin) {
            ApiError::NotFound(msg) => {
                assert_eq!(msg, "Group not found or insufficient permissions")
            }
            other => panic!("unexpected {:?}", other),
        }
        match ApiError::from(AuthzError::TaskDenied) {
            ApiError::NotFound(msg) => assert_eq!(msg, "Task not found or access denied"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_weak_password_is_validation_error() {
        match ApiError::from(PasswordError::Weak("too weak")) {
            ApiError::Validation(details) => {
                assert_eq!(details, vec![ValidationErrorDetail::new("password", "too weak")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
