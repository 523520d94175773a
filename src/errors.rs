use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::middleware::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Standard error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Order with ID 550e8400-e29b-41d4-a716-446655440000 not found",
    "request_id": "req-abc123xyz",
    "timestamp": "2025-06-01T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Order with ID 550e8400-e29b-41d4-a716-446655440000 not found")]
    pub message: String,
    /// Unique request identifier for support and reconciliation
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    #[schema(example = "2025-06-01T10:30:00.000Z")]
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Sold out: {0}")]
    SoldOut(String),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Email delivery failed: {0}")]
    EmailError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Document rendering failed: {0}")]
    RenderError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Internal server error")]
    InternalServerError,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::InvalidInput(_)
            | Self::InvalidStatus(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::SoldOut(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
            Self::EmailError(_) | Self::ExternalServiceError(_) | Self::ExternalApiError(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::EventError(_)
            | Self::RenderError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_)
            | Self::InternalServerError
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::RenderError(_)
            | Self::SerializationError(_)
            | Self::EventError(_)
            | Self::Other(_) => "Internal server error".to_string(),
            Self::InternalError(_) | Self::InternalServerError => {
                "Internal server error".to_string()
            }
            // Trust failures stay generic: no hint about which check failed
            Self::Unauthorized(_) => "Unauthorized".to_string(),
            Self::ServiceUnavailable(msg) => format!("Service unavailable: {}", msg),
            // User-facing errors carry the actual message
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.response_message();

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: error_message,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
