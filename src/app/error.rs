use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::Error as SqlxError;

/// Application error type for unified error handling across the app.
///
/// All variants are terminal: the core never retries, the caller (UI layer)
/// translates them into user-facing messages. `AccessDenied` and
/// `PermissionDenied` are deliberately separate variants: one signals a
/// cross-tenant access attempt, the other an under-privileged request from
/// the correct tenant. They must stay distinguishable in logs.
#[derive(Debug)]
pub enum AppError {
    /// No verifiable caller identity (401).
    Unauthenticated,

    /// Identity verified but no internal user exists yet (403). The client
    /// reacts by running the onboarding flow, not by re-authenticating.
    NotProvisioned,

    /// Requested record does not exist (404).
    NotFound(String),

    /// The caller cannot access this record at all (403): tenant mismatch,
    /// or a field-tier caller reading a record they are not assigned to.
    /// The message says which; the two must stay apart in logs. Checked
    /// before, and independently of, permission flags.
    AccessDenied(String),

    /// Tenant matches but the role's permission flag for the action is
    /// false (403).
    PermissionDenied(String),

    /// Reactivating a user would exceed the organization's seat limit (409).
    LimitExceeded,

    /// Validation errors (400 Bad Request) - invalid input data.
    Validation(String),

    /// Database errors (500 Internal Server Error).
    Database(SqlxError),

    /// Generic internal errors (500 Internal Server Error).
    Internal,
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Not authenticated".to_string(),
            ),
            AppError::NotProvisioned => (
                StatusCode::FORBIDDEN,
                "not_provisioned",
                "User not provisioned".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::AccessDenied(msg) => {
                tracing::warn!(%msg, "access denied");
                (StatusCode::FORBIDDEN, "access_denied", msg)
            }
            AppError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, "permission_denied", msg),
            AppError::LimitExceeded => (
                StatusCode::CONFLICT,
                "limit_exceeded",
                "User limit reached. Please upgrade your plan.".to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation", msg),
            AppError::Database(err) => {
                tracing::error!(%err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "code": code,
            "error": message
        }));

        (status, body).into_response()
    }
}
