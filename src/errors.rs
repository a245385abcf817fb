use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error description
    pub error: String,
    /// Stable machine-readable error kind
    pub code: String,
    /// RFC 3339 timestamp when the error was rendered
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cart mismatch: {0}")]
    CartMismatch(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payment authorization failed: {0}")]
    AuthorizationFailed(String),

    /// The provider did not answer in time. The charge may or may not exist.
    #[error("Payment authorization outcome unknown: {0}")]
    AuthorizationAmbiguous(String),

    /// Payment was authorized but the order could not be written.
    #[error("Order persistence failed after authorization {authorization_id}: {reason}")]
    OrderPersistenceFailed {
        authorization_id: String,
        reason: String,
    },

    #[error("Cart clear failed: {0}")]
    CartClearFailed(String),

    #[error("Pricing overflow")]
    PricingOverflow,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_)
            | Self::CartMismatch(_)
            | Self::EmptyCart
            | Self::InsufficientStock(_)
            | Self::InvalidStatusTransition { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AuthorizationFailed(_)
            | Self::AuthorizationAmbiguous(_)
            | Self::OrderPersistenceFailed { .. }
            | Self::CartClearFailed(_)
            | Self::PricingOverflow
            | Self::DatabaseError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error kind, also used as the `reason` label on failure metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::CartMismatch(_) => "cart_mismatch",
            Self::EmptyCart => "empty_cart",
            Self::InsufficientStock(_) => "insufficient_stock",
            Self::NotFound(_) => "not_found",
            Self::AuthorizationFailed(_) => "authorization_failed",
            Self::AuthorizationAmbiguous(_) => "authorization_ambiguous",
            Self::OrderPersistenceFailed { .. } => "order_persistence_failed",
            Self::CartClearFailed(_) => "cart_clear_failed",
            Self::PricingOverflow => "pricing_overflow",
            Self::InvalidStatusTransition { .. } => "invalid_status_transition",
            Self::DatabaseError(_) => "database_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Storage and internal errors return generic messages.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::PricingOverflow => "Internal server error".to_string(),
            Self::OrderPersistenceFailed { .. } => {
                "Payment was authorized but the order could not be saved; support has been notified"
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: self.response_message(),
            code: self.code().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
