//! Database models for servicebook
//!
//! This module defines the entity structs that map to PostgreSQL tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Primary key of `profiles.users`
pub type UserId = i64;

// ============================================================================
// Credential Model
// ============================================================================

/// Authentication material for one user
#[derive(Clone, FromRow)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub login: String,
    pub password_hash: Vec<u8>,
    pub password_salt: Vec<u8>,
    /// Current token generation; `None` until the first login or after revocation
    pub session_epoch: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("user_id", &self.user_id)
            .field("login", &self.login)
            .field("has_session", &self.session_epoch.is_some())
            .field("last_login_at", &self.last_login_at)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Service Book Models
// ============================================================================

/// A car owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub car_id: i64,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub name: String,
    pub odo: i32,
    pub avatar: bool,
}

/// A resource whose ownership can be checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnedResource {
    Car(i64),
    Group(i64),
    Service(i64),
}

impl std::fmt::Display for OwnedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnedResource::Car(id) => write!(f, "car {id}"),
            OwnedResource::Group(id) => write!(f, "group {id}"),
            OwnedResource::Service(id) => write!(f, "service {id}"),
        }
    }
}
