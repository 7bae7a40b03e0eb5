//! Recovery service routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::RecoveryError;
use crate::notify::Channel;

/// Request to start a password reset
#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    /// Email address or phone number on the account
    pub identifier: String,
    /// Channel the reset message goes out on
    pub channel: Channel,
}

/// Acknowledgement for reset requests
#[derive(Serialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
}

/// Request to redeem a reset token
#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub user_id: Uuid,
    pub token: String,
    pub new_password: String,
}

/// Response for a completed reset
#[derive(Serialize)]
pub struct ResetPasswordResponse {
    pub message: String,
}

/// Create the router for the recovery service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "recovery-service"
    }))
}

/// Start a password reset for an email or phone identifier
///
/// Responds `202 Accepted` with the same acknowledgement whether or not
/// the identifier belongs to an account, so responses never reveal which
/// identifiers are registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, RecoveryError> {
    info!("Password reset requested over {}", payload.channel);

    state
        .recovery
        .request_reset(&payload.identifier, payload.channel)
        .await?;

    let response = ForgotPasswordResponse {
        message: "If the account exists, a reset message is on its way".to_string(),
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Redeem a reset token and set a new password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, RecoveryError> {
    info!("Password reset redemption for user {}", payload.user_id);

    state
        .recovery
        .redeem(payload.user_id, &payload.token, &payload.new_password)
        .await?;

    let response = ResetPasswordResponse {
        message: "Password updated".to_string(),
    };

    Ok((StatusCode::OK, Json(response)))
}
