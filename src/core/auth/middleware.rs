//! Bearer-token authorization middleware
//!
//! `require_auth` validates the access token on every protected route and
//! stores the caller's identity in the request extensions. Handlers receive
//! it through the [`AuthenticatedUser`] extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::core::auth::service::{AuthError, AuthService};
use crate::core::db::models::UserId;

/// Identity of a caller whose access token was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AuthError::Unauthorized)
    }
}

/// Reject the request with 401 unless it carries a valid access token
pub async fn require_auth(
    State(auth_service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer_token(request.headers())?;
    let user_id = auth_service.validate_access_token(&token)?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Unauthorized)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::Unauthorized);
    }

    Ok(token.to_string())
}
