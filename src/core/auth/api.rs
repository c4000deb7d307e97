//! Auth API endpoints
//!
//! Provides REST API endpoints for authentication:
//! - POST /api/auth/login - Login and get tokens
//! - POST /api/auth/refresh_token - Exchange a token pair for a new one
//! - POST /api/auth/change_password - Change password (requires access token)

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use std::sync::Arc;

use crate::core::auth::middleware::{AuthenticatedUser, extract_bearer_token, require_auth};
use crate::core::auth::{
    AuthError, AuthService, ChangePasswordRequest, LoginRequest, RefreshRequest, TokenPair,
};

/// Auth API state containing the auth service
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AuthService,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AuthError::InternalError(detail) => {
                tracing::error!(error = %detail, "internal error");
                let body = ApiError::new("Internal server error", "INTERNAL_ERROR");
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };

        let body = ApiError::new(self.to_string(), code);

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::BadRequest(rejection.body_text())
    }
}

/// Create the auth API router
pub fn auth_api_router(state: AuthApiState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.auth_service.clone(), require_auth);
    let state = Arc::new(state);

    let protected = Router::new()
        .route("/api/auth/change_password", post(change_password_handler))
        .route_layer(auth_layer);

    Router::new()
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/refresh_token", post(refresh_handler))
        .merge(protected)
        .with_state(state)
}

/// POST /api/auth/login
/// Login and get access/refresh tokens
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AuthError> {
    let Json(request) = payload?;

    let tokens = state.auth_service.login(request).await?;

    tracing::debug!("login succeeded");

    Ok(Json(tokens))
}

/// POST /api/auth/refresh_token
/// Exchange the current (possibly expired) access token and the refresh token
/// for a new pair
async fn refresh_handler(
    State(state): State<Arc<AuthApiState>>,
    headers: HeaderMap,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AuthError> {
    let access_token = extract_bearer_token(&headers)?;
    let Json(request) = payload?;

    let tokens = state
        .auth_service
        .refresh(&access_token, &request.refresh_token)
        .await?;

    Ok(Json(tokens))
}

/// POST /api/auth/change_password
/// Change password (requires current password); the session is revoked
async fn change_password_handler(
    State(state): State<Arc<AuthApiState>>,
    user: AuthenticatedUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<StatusCode, AuthError> {
    let Json(request) = payload?;

    state
        .auth_service
        .change_password(user.user_id, request)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
