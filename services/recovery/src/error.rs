//! Custom error types for the recovery service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Custom error type for the recovery service
#[derive(Error, Debug)]
pub enum RecoveryError {
    /// Record does not exist
    #[error("Not found")]
    NotFound,

    /// Email already registered
    #[error("Email already registered")]
    DuplicateEmail,

    /// Request payload failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reset token exists but its validity window has passed
    #[error("Reset token expired")]
    Expired,

    /// Reset token missing or does not match the pending one
    #[error("Reset token mismatch")]
    Mismatch,

    /// Transport reported a delivery failure
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// Credential store cannot be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for RecoveryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RecoveryError::NotFound,
            StoreError::DuplicateEmail => RecoveryError::DuplicateEmail,
            StoreError::Unavailable(msg) => RecoveryError::StoreUnavailable(msg),
        }
    }
}

impl IntoResponse for RecoveryError {
    fn into_response(self) -> Response {
        // Expired and Mismatch deliberately collapse into one message so
        // the response does not reveal whether a reset is pending.
        let (status, error_message) = match self {
            RecoveryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            RecoveryError::DuplicateEmail => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            RecoveryError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            RecoveryError::Expired | RecoveryError::Mismatch => (
                StatusCode::BAD_REQUEST,
                "invalid or expired token".to_string(),
            ),
            RecoveryError::DeliveryFailed(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Could not deliver the reset message".to_string(),
            ),
            RecoveryError::StoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            ),
            RecoveryError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for recovery results
pub type RecoveryResult<T> = Result<T, RecoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_message(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_expired_and_mismatch_share_one_generic_response() {
        let expired = RecoveryError::Expired.into_response();
        let mismatch = RecoveryError::Mismatch.into_response();

        assert_eq!(expired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);

        let expired_msg = body_message(expired).await;
        let mismatch_msg = body_message(mismatch).await;
        assert_eq!(expired_msg, "invalid or expired token");
        assert_eq!(expired_msg, mismatch_msg);
    }

    #[tokio::test]
    async fn test_delivery_failure_maps_to_service_unavailable() {
        let response = RecoveryError::DeliveryFailed("smtp down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        // The provider detail stays out of the response body.
        let msg = body_message(response).await;
        assert!(!msg.contains("smtp down"));
    }

    #[test]
    fn test_store_errors_convert_to_their_service_variants() {
        assert!(matches!(
            RecoveryError::from(StoreError::NotFound),
            RecoveryError::NotFound
        ));
        assert!(matches!(
            RecoveryError::from(StoreError::DuplicateEmail),
            RecoveryError::DuplicateEmail
        ));
        assert!(matches!(
            RecoveryError::from(StoreError::Unavailable("pool timeout".to_string())),
            RecoveryError::StoreUnavailable(_)
        ));
    }
}
