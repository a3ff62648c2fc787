// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::config;
use crate::models::RoleName;

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Every failure renders the `{success:false, message, code}` envelope.
/// Conflict intentionally maps to 400 (not 409): the frontend treats any
/// 400 as a user-correctable input problem and relies on `code` to tell
/// validation and uniqueness failures apart.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    Validation(String),
    Conflict(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden {
        message: String,
        required: Vec<RoleName>,
        actual: RoleName,
    },

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden { message, .. } => message,
            ApiError::NotFound(msg) => msg,
            ApiError::Internal { message, .. } => message,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "message": self.message(),
            "code": self.error_code(),
        });

        match self {
            ApiError::Forbidden { required, actual, .. } => {
                body["rolRequerido"] = json!(required);
                body["tuRol"] = json!(actual);
            }
            ApiError::Internal { detail: Some(detail), .. } => {
                // Internal detail is only exposed outside production
                if !config::config().is_production() {
                    body["detail"] = json!(detail);
                }
            }
            _ => {}
        }

        body
    }
}

// Static constructors, one per taxonomy entry
impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(required: &[RoleName], actual: RoleName) -> Self {
        ApiError::Forbidden {
            message: "No tienes permisos para acceder a este recurso".to_string(),
            required: required.to_vec(),
            actual,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
            detail: None,
        }
    }

    /// Convert a store-layer failure under a stable public message.
    ///
    /// Unique-index violations (Postgres 23505) are the authoritative
    /// Conflict signal: the controller pre-checks only provide a
    /// friendlier message on the fast path.
    pub fn db(message: impl Into<String>, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return ApiError::Conflict("El valor ya existe y debe ser único".to_string());
            }
        }
        let message = message.into();
        tracing::error!("database error: {}: {}", message, err);
        ApiError::Internal {
            message,
            detail: Some(err.to_string()),
        }
    }
}

impl From<crate::database::DatabaseError> for ApiError {
    fn from(err: crate::database::DatabaseError) -> Self {
        tracing::error!("database unavailable: {}", err);
        ApiError::Internal {
            message: "Error interno del servidor".to_string(),
            detail: Some(err.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
