//! Registration API endpoints
//!
//! - POST /api/register/send_code - Email a sign-up confirmation code
//! - POST /api/register/register_by_email - Create an account with the code
//! - POST /api/register/recover/send_code - Email a password recovery code
//! - POST /api/register/recover/password - Set a new password with the code

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;

use crate::core::auth::ApiError;
use crate::core::register::service::{
    ConfirmRequest, RegisterError, RegisterService, SendCodeRequest,
};

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RegisterError::InvalidEmail => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
            RegisterError::EmptyPassword => (StatusCode::BAD_REQUEST, "EMPTY_PASSWORD"),
            RegisterError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            RegisterError::CodeMismatch => (StatusCode::FORBIDDEN, "CONFIRM_CODE_MISMATCH"),
            RegisterError::LoginAlreadyExists => (StatusCode::CONFLICT, "LOGIN_EXISTS"),
            RegisterError::CodeAlreadySent => (StatusCode::TOO_MANY_REQUESTS, "CODE_ALREADY_SENT"),
            RegisterError::InternalError(detail) => {
                tracing::error!(error = %detail, "registration failed");
                let body = ApiError::new("Internal server error", "INTERNAL_ERROR");
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };

        (status, Json(ApiError::new(self.to_string(), code))).into_response()
    }
}

impl From<JsonRejection> for RegisterError {
    fn from(rejection: JsonRejection) -> Self {
        RegisterError::BadRequest(rejection.body_text())
    }
}

/// Create the registration API router
pub fn register_api_router(service: RegisterService) -> Router {
    Router::new()
        .route("/api/register/send_code", post(send_code_handler))
        .route("/api/register/register_by_email", post(register_handler))
        .route("/api/register/recover/send_code", post(recover_send_code_handler))
        .route("/api/register/recover/password", post(recover_password_handler))
        .with_state(Arc::new(service))
}

/// POST /api/register/send_code
async fn send_code_handler(
    State(service): State<Arc<RegisterService>>,
    payload: Result<Json<SendCodeRequest>, JsonRejection>,
) -> Result<StatusCode, RegisterError> {
    let Json(request) = payload?;
    service.send_code(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/register/register_by_email
async fn register_handler(
    State(service): State<Arc<RegisterService>>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<StatusCode, RegisterError> {
    let Json(request) = payload?;
    service.register_by_email(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/register/recover/send_code
async fn recover_send_code_handler(
    State(service): State<Arc<RegisterService>>,
    payload: Result<Json<SendCodeRequest>, JsonRejection>,
) -> Result<StatusCode, RegisterError> {
    let Json(request) = payload?;
    service.recover_send_code(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/register/recover/password
async fn recover_password_handler(
    State(service): State<Arc<RegisterService>>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<StatusCode, RegisterError> {
    let Json(request) = payload?;
    service.recover_password(request).await?;
    Ok(StatusCode::NO_CONTENT)
}
