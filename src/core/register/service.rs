//! Registration service
//!
//! Email-confirmed sign-up and password recovery. Both flows send a 4-digit
//! code to the address first and accept it once within its lifetime.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::rngs::OsRng;

use crate::core::auth::password::{HashError, PasswordHasher, hash_with_new_salt};
use crate::core::db::repositories::{CredentialRepositoryError, CredentialStore};
use crate::core::mail::{MailError, MailKind, Mailer};
use crate::core::register::codes::ConfirmationCodes;
use crate::core::validation::is_valid_email;

/// Registration error types
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("{0}")]
    BadRequest(String),

    #[error("Confirmation code does not match")]
    CodeMismatch,

    #[error("Login already exists")]
    LoginAlreadyExists,

    #[error("Code has already been sent")]
    CodeAlreadySent,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<CredentialRepositoryError> for RegisterError {
    fn from(err: CredentialRepositoryError) -> Self {
        match err {
            CredentialRepositoryError::LoginAlreadyExists => RegisterError::LoginAlreadyExists,
            CredentialRepositoryError::NotFound => RegisterError::CodeMismatch,
            _ => RegisterError::InternalError(err.to_string()),
        }
    }
}

impl From<HashError> for RegisterError {
    fn from(err: HashError) -> Self {
        RegisterError::InternalError(err.to_string())
    }
}

impl From<MailError> for RegisterError {
    fn from(err: MailError) -> Self {
        RegisterError::InternalError(err.to_string())
    }
}

/// Request to send a confirmation code
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

/// Request that completes registration or recovery
#[derive(Clone, serde::Deserialize)]
pub struct ConfirmRequest {
    pub email: String,
    pub code: u16,
    pub password: String,
}

/// Registration service
#[derive(Clone)]
pub struct RegisterService {
    store: Arc<dyn CredentialStore>,
    codes: Arc<dyn ConfirmationCodes>,
    mailer: Arc<dyn Mailer>,
    hasher: Arc<dyn PasswordHasher>,
}

impl RegisterService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codes: Arc<dyn ConfirmationCodes>,
        mailer: Arc<dyn Mailer>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            store,
            codes,
            mailer,
            hasher,
        }
    }

    /// Validate email format
    pub(crate) fn validate_email(email: &str) -> Result<(), RegisterError> {
        if is_valid_email(email) {
            Ok(())
        } else {
            Err(RegisterError::InvalidEmail)
        }
    }

    fn generate_code() -> u16 {
        OsRng.gen_range(1000..=9999)
    }

    async fn issue_code(
        &self,
        email: &str,
        kind: fn(u16, Duration) -> MailKind,
    ) -> Result<bool, RegisterError> {
        let code = Self::generate_code();
        if !self.codes.add(email, code).await {
            return Ok(false);
        }

        if let Err(e) = self.mailer.send(email, kind(code, self.codes.ttl())).await {
            // Let the user ask again instead of waiting out the TTL
            self.codes.remove(email).await;
            return Err(e.into());
        }

        Ok(true)
    }

    async fn check_code(&self, email: &str, code: u16) -> Result<(), RegisterError> {
        match self.codes.get(email).await {
            Some(pending) if pending == code => Ok(()),
            Some(_) => {
                tracing::debug!("confirmation rejected: wrong code");
                Err(RegisterError::CodeMismatch)
            }
            None => {
                tracing::debug!("confirmation rejected: no pending code");
                Err(RegisterError::CodeMismatch)
            }
        }
    }

    /// Send a sign-up confirmation code; a pending code is left as is
    pub async fn send_code(&self, request: SendCodeRequest) -> Result<(), RegisterError> {
        Self::validate_email(&request.email)?;

        if !self
            .issue_code(&request.email, |code, valid_for| MailKind::ConfirmEmail {
                code,
                valid_for,
            })
            .await?
        {
            tracing::debug!("confirmation code already pending");
        }

        Ok(())
    }

    /// Create an account once the emailed code is confirmed
    pub async fn register_by_email(&self, request: ConfirmRequest) -> Result<(), RegisterError> {
        Self::validate_email(&request.email)?;
        if request.password.is_empty() {
            return Err(RegisterError::EmptyPassword);
        }

        self.check_code(&request.email, request.code).await?;

        if self.store.find_by_login(&request.email).await?.is_some() {
            return Err(RegisterError::LoginAlreadyExists);
        }

        let (hash, salt) = hash_with_new_salt(self.hasher.as_ref(), &request.password)?;
        let user_id = self.store.create(&request.email, &hash, &salt).await?;

        self.codes.remove(&request.email).await;

        tracing::info!(user_id, "user registered");
        Ok(())
    }

    /// Send a password recovery code; fails while one is pending
    pub async fn recover_send_code(&self, request: SendCodeRequest) -> Result<(), RegisterError> {
        Self::validate_email(&request.email)?;

        if !self
            .issue_code(&request.email, |code, valid_for| MailKind::RecoveryCode {
                code,
                valid_for,
            })
            .await?
        {
            return Err(RegisterError::CodeAlreadySent);
        }

        Ok(())
    }

    /// Set a new password once the emailed recovery code is confirmed.
    ///
    /// Any active session is revoked.
    pub async fn recover_password(&self, request: ConfirmRequest) -> Result<(), RegisterError> {
        Self::validate_email(&request.email)?;
        if request.password.is_empty() {
            return Err(RegisterError::EmptyPassword);
        }

        self.check_code(&request.email, request.code).await?;

        let Some(record) = self.store.find_by_login(&request.email).await? else {
            return Err(RegisterError::CodeMismatch);
        };

        let (hash, salt) = hash_with_new_salt(self.hasher.as_ref(), &request.password)?;
        self.store
            .reset_password(record.user_id, &hash, &salt)
            .await?;

        self.codes.remove(&request.email).await;

        tracing::info!(user_id = record.user_id, "password recovered");
        Ok(())
    }
}
