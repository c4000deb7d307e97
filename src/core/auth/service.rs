//! Authentication service
//!
//! Provides business logic for login, token refresh, access-token validation
//! and password changes. Coordinates between the credential store, the
//! password hasher and the JWT service.
//!
//! Each user has at most one valid token generation, named by the session
//! epoch stored next to the credentials. Login and refresh replace the epoch,
//! password changes clear it.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::core::auth::jwt::{Expiry, JwtError, JwtService, TokenPair, TokenType};
use crate::core::auth::password::{
    HashError, PasswordHasher, SALT_LEN, constant_time_eq, hash_with_new_salt,
};
use crate::core::db::models::UserId;
use crate::core::db::repositories::{CredentialRepositoryError, CredentialStore};
use crate::core::validation::is_valid_email;

/// Salt used to burn a hash when the login does not exist
const DUMMY_SALT: [u8; SALT_LEN] = [0x5a; SALT_LEN];

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<CredentialRepositoryError> for AuthError {
    fn from(err: CredentialRepositoryError) -> Self {
        match err {
            CredentialRepositoryError::NotFound => AuthError::Unauthorized,
            _ => AuthError::InternalError(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Malformed(_)
            | JwtError::InvalidSignature
            | JwtError::Expired
            | JwtError::InvalidTokenType => {
                tracing::debug!(reason = %err, "token rejected");
                AuthError::Unauthorized
            }
            _ => AuthError::InternalError(err.to_string()),
        }
    }
}

impl From<HashError> for AuthError {
    fn from(err: HashError) -> Self {
        AuthError::InternalError(err.to_string())
    }
}

/// Login request data
#[derive(Clone, serde::Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Token refresh request
#[derive(Clone, serde::Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request for changing password
#[derive(Clone, serde::Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    jwt_service: JwtService,
    hasher: Arc<dyn PasswordHasher>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        store: Arc<dyn CredentialStore>,
        jwt_service: JwtService,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            store,
            jwt_service,
            hasher,
        }
    }

    fn new_epoch() -> String {
        Uuid::new_v4().to_string()
    }

    /// Login an existing user and start a new token generation
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPair, AuthError> {
        if request.login.is_empty() || request.password.is_empty() {
            return Err(AuthError::BadRequest(
                "login and password are required".to_string(),
            ));
        }
        if !is_valid_email(&request.login) {
            return Err(AuthError::BadRequest(
                "login must be a valid email".to_string(),
            ));
        }

        let Some(record) = self.store.find_by_login(&request.login).await? else {
            // Same hashing cost as a wrong password
            let _ = self.hasher.hash(&request.password, &DUMMY_SALT);
            tracing::debug!("login rejected: unknown login");
            return Err(AuthError::Unauthorized);
        };

        let valid = self.hasher.verify(
            &request.password,
            &record.password_salt,
            &record.password_hash,
        )?;
        if !valid {
            tracing::debug!(user_id = record.user_id, "login rejected: wrong password");
            return Err(AuthError::Unauthorized);
        }

        let epoch = Self::new_epoch();
        let tokens = self
            .jwt_service
            .generate_token_pair(record.user_id, &epoch)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        self.store
            .update_session_epoch(record.user_id, Some(&epoch), Some(Utc::now()))
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        Ok(tokens)
    }

    /// Exchange a token pair for a new one.
    ///
    /// The access token may be expired; the refresh token may not. Both must
    /// carry the epoch currently stored for the user.
    pub async fn refresh(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::BadRequest("refresh_token is required".to_string()));
        }

        let access = self
            .jwt_service
            .decode(access_token, TokenType::Access, Expiry::Skip)?;
        let refresh = self
            .jwt_service
            .decode(refresh_token, TokenType::Refresh, Expiry::Enforce)?;

        if access.uid != refresh.uid || !constant_time_eq(access.sid.as_bytes(), refresh.sid.as_bytes())
        {
            tracing::debug!(user_id = access.uid, "refresh rejected: token pair mismatch");
            return Err(AuthError::Unauthorized);
        }

        let record = self
            .store
            .find_by_id(access.uid)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let Some(stored_epoch) = record.session_epoch.as_deref() else {
            tracing::debug!(user_id = access.uid, "refresh rejected: no active session");
            return Err(AuthError::Unauthorized);
        };
        if !constant_time_eq(stored_epoch.as_bytes(), refresh.sid.as_bytes()) {
            tracing::debug!(user_id = access.uid, "refresh rejected: stale epoch");
            return Err(AuthError::Unauthorized);
        }

        let next_epoch = Self::new_epoch();
        let tokens = self.jwt_service.generate_token_pair(record.user_id, &next_epoch)?;

        let rotated = self
            .store
            .rotate_session_epoch(record.user_id, stored_epoch, &next_epoch)
            .await?;
        if !rotated {
            tracing::warn!(user_id = record.user_id, "refresh lost a concurrent rotation");
            return Err(AuthError::Unauthorized);
        }

        Ok(tokens)
    }

    /// Validate an access token and return the user ID if valid.
    ///
    /// Stateless: the store is not consulted.
    pub fn validate_access_token(&self, token: &str) -> Result<UserId, AuthError> {
        let claims = self.jwt_service.validate_access_token(token)?;
        Ok(claims.uid)
    }

    /// Change user password and end the current session
    pub async fn change_password(
        &self,
        user_id: UserId,
        request: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let record = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let valid = self.hasher.verify(
            &request.current_password,
            &record.password_salt,
            &record.password_hash,
        )?;
        if !valid {
            tracing::debug!(user_id, "password change rejected: wrong current password");
            return Err(AuthError::Unauthorized);
        }

        if request.new_password.is_empty() {
            return Err(AuthError::BadRequest(
                "new_password must not be empty".to_string(),
            ));
        }

        let (hash, salt) = hash_with_new_salt(self.hasher.as_ref(), &request.new_password)?;
        // Force re-login everywhere
        self.store.reset_password(user_id, &hash, &salt).await?;

        tracing::info!(user_id, "password changed");
        Ok(())
    }
}
