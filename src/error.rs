// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::database::manager::DatabaseError;

/// Domain error taxonomy. Every variant maps to one HTTP status; persistence failures are
/// wrapped by the handler that observed them and never reach the client verbatim.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    Validation {
        message: String,
        field_errors: BTreeMap<String, String>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    NotAllowed(String),

    // 404 Not Found (also used for tenant mismatches)
    NotFound(String),

    // 500 Internal Server Error, wrapping the failed write
    Create { message: String, cause: Option<String> },
    Update { message: String, cause: Option<String> },
    Delete { message: String, cause: Option<String> },
    Internal { message: String, cause: Option<String> },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotAllowed(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Create { .. } => 500,
            ApiError::Update { .. } => 500,
            ApiError::Delete { .. } => 500,
            ApiError::Internal { .. } => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotAllowed(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Create { message, .. } => message,
            ApiError::Update { message, .. } => message,
            ApiError::Delete { message, .. } => message,
            ApiError::Internal { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotAllowed(_) => "NOT_ALLOWED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Create { .. } => "CREATE_ERROR",
            ApiError::Update { .. } => "UPDATE_ERROR",
            ApiError::Delete { .. } => "DELETE_ERROR",
            ApiError::Internal { .. } => "APPLICATION_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    fn cause(&self) -> Option<&str> {
        match self {
            ApiError::Create { cause, .. }
            | ApiError::Update { cause, .. }
            | ApiError::Delete { cause, .. }
            | ApiError::Internal { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }

    /// Failure envelope. `debug` adds the wrapped cause as `trace`; outside debug mode
    /// internal errors collapse into a generic message.
    pub fn to_json(&self, debug: bool) -> Value {
        if !debug && matches!(self, ApiError::Internal { .. }) {
            return json!({
                "status": false,
                "error": {
                    "code": 500,
                    "type": self.error_code(),
                    "message": "Internal Application Error"
                }
            });
        }

        let mut error = json!({
            "code": self.status_code(),
            "type": self.error_code(),
            "message": self.message()
        });

        if let ApiError::Validation { field_errors, .. } = self {
            if !field_errors.is_empty() {
                error["fields"] = json!(field_errors);
            }
        }

        if debug {
            if let Some(cause) = self.cause() {
                error["trace"] = json!(cause);
            }
        }

        json!({ "status": false, "error": error })
    }
}

impl ApiError {
    pub fn validation(message: impl Into<String>, field_errors: BTreeMap<String, String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        ApiError::NotAllowed(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn create(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        let message = message.into();
        tracing::error!("{}: {}", message, cause);
        ApiError::Create {
            message,
            cause: Some(cause.to_string()),
        }
    }

    pub fn update(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        let message = message.into();
        tracing::error!("{}: {}", message, cause);
        ApiError::Update {
            message,
            cause: Some(cause.to_string()),
        }
    }

    pub fn delete(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        let message = message.into();
        tracing::error!("{}: {}", message, cause);
        ApiError::Delete {
            message,
            cause: Some(cause.to_string()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
            cause: None,
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Log the real error but return a generic message
                tracing::error!("Database error: {}", other);
                ApiError::Internal {
                    message: "An error occurred while processing your request".to_string(),
                    cause: Some(other.to_string()),
                }
            }
        }
    }
}

impl From<crate::vault::VaultError> for ApiError {
    fn from(err: crate::vault::VaultError) -> Self {
        tracing::error!("Secure field error: {}", err);
        ApiError::Internal {
            message: "Failed to process a secure field".to_string(),
            cause: Some(err.to_string()),
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
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(code = self.status_code(), "{}", self.message());
        } else {
            tracing::info!(code = self.status_code(), "{}", self.message());
        }
        (status, Json(self.to_json(crate::is_debug!()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_generic_outside_debug() {
        let err = ApiError::Internal {
            message: "relation lookup failed".to_string(),
            cause: Some("No relation named x".to_string()),
        };
        let body = err.to_json(false);
        assert_eq!(body["status"], false);
        assert_eq!(body["error"]["code"], 500);
        assert_eq!(body["error"]["message"], "Internal Application Error");
        assert!(body["error"].get("trace").is_none());
    }

    #[test]
    fn debug_mode_adds_trace() {
        let err = ApiError::Create {
            message: "Error while trying to create a new hook".to_string(),
            cause: Some("duplicate key".to_string()),
        };
        let body = err.to_json(true);
        assert_eq!(body["error"]["code"], 500);
        assert_eq!(body["error"]["message"], "Error while trying to create a new hook");
        assert_eq!(body["error"]["trace"], "duplicate key");

        let hidden = err.to_json(false);
        assert!(hidden["error"].get("trace").is_none());
        assert_eq!(hidden["error"]["message"], "Error while trying to create a new hook");
    }

    #[test]
    fn validation_errors_list_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("url".to_string(), "must be a valid URL".to_string());
        let body = ApiError::validation("url must be a valid URL", fields).to_json(false);
        assert_eq!(body["error"]["code"], 400);
        assert_eq!(body["error"]["fields"]["url"], "must be a valid URL");
    }

    #[test]
    fn database_not_found_maps_to_404() {
        let err: ApiError = DatabaseError::NotFound("Hook not found".to_string()).into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "Hook not found");
    }
}
