//! Credential repository
//!
//! Stores per-user password material and the current session epoch in
//! `profiles.users`. The epoch column (`token_uuid`) is the only state the
//! token machinery writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::core::db::models::{CredentialRecord, UserId};

/// Credential repository error types
#[derive(Debug, thiserror::Error)]
pub enum CredentialRepositoryError {
    #[error("User not found")]
    NotFound,

    #[error("Login already exists")]
    LoginAlreadyExists,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Storage for credential records.
///
/// Every operation touches a single user's row.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_login(
        &self,
        login: &str,
    ) -> Result<Option<CredentialRecord>, CredentialRepositoryError>;

    async fn find_by_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<CredentialRecord>, CredentialRepositoryError>;

    /// Create a user with no session; fails if the login is taken
    async fn create(
        &self,
        login: &str,
        password_hash: &[u8],
        password_salt: &[u8],
    ) -> Result<UserId, CredentialRepositoryError>;

    /// Store a new password and clear the session epoch in one write
    async fn reset_password(
        &self,
        user_id: UserId,
        password_hash: &[u8],
        password_salt: &[u8],
    ) -> Result<(), CredentialRepositoryError>;

    /// Unconditionally set (or clear) the session epoch.
    ///
    /// `last_login_at` is only written when provided.
    async fn update_session_epoch(
        &self,
        user_id: UserId,
        session_epoch: Option<&str>,
        last_login_at: Option<DateTime<Utc>>,
    ) -> Result<(), CredentialRepositoryError>;

    /// Replace the epoch only if it still equals `current`.
    ///
    /// Returns `false` when another writer rotated it first.
    async fn rotate_session_epoch(
        &self,
        user_id: UserId,
        current: &str,
        next: &str,
    ) -> Result<bool, CredentialRepositoryError>;
}

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct CredentialRepository {
    pool: PgPool,
}

impl CredentialRepository {
    /// Create a new credential repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_CREDENTIAL: &str = r#"
    SELECT
        user_id,
        login,
        password_hash,
        password_salt,
        token_uuid AS session_epoch,
        last_login_dt AS last_login_at
    FROM profiles.users
"#;

#[async_trait]
impl CredentialStore for CredentialRepository {
    async fn find_by_login(
        &self,
        login: &str,
    ) -> Result<Option<CredentialRecord>, CredentialRepositoryError> {
        let record = sqlx::query_as::<_, CredentialRecord>(&format!(
            "{SELECT_CREDENTIAL} WHERE login = $1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<CredentialRecord>, CredentialRepositoryError> {
        let record = sqlx::query_as::<_, CredentialRecord>(&format!(
            "{SELECT_CREDENTIAL} WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn create(
        &self,
        login: &str,
        password_hash: &[u8],
        password_salt: &[u8],
    ) -> Result<UserId, CredentialRepositoryError> {
        let result = sqlx::query_scalar::<_, UserId>(
            r#"
            INSERT INTO profiles.users (login, password_hash, password_salt, oauth, last_login_dt)
            VALUES ($1, $2, $3, FALSE, NOW())
            RETURNING user_id
            "#,
        )
        .bind(login)
        .bind(password_hash)
        .bind(password_salt)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user_id) => Ok(user_id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(CredentialRepositoryError::LoginAlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn reset_password(
        &self,
        user_id: UserId,
        password_hash: &[u8],
        password_salt: &[u8],
    ) -> Result<(), CredentialRepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles.users
            SET password_hash = $2, password_salt = $3, token_uuid = NULL
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .bind(password_salt)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CredentialRepositoryError::NotFound);
        }

        Ok(())
    }

    async fn update_session_epoch(
        &self,
        user_id: UserId,
        session_epoch: Option<&str>,
        last_login_at: Option<DateTime<Utc>>,
    ) -> Result<(), CredentialRepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles.users
            SET token_uuid = $2, last_login_dt = COALESCE($3, last_login_dt)
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(session_epoch)
        .bind(last_login_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CredentialRepositoryError::NotFound);
        }

        Ok(())
    }

    async fn rotate_session_epoch(
        &self,
        user_id: UserId,
        current: &str,
        next: &str,
    ) -> Result<bool, CredentialRepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles.users
            SET token_uuid = $3
            WHERE user_id = $1 AND token_uuid = $2
            "#,
        )
        .bind(user_id)
        .bind(current)
        .bind(next)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
