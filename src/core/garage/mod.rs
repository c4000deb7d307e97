//! Garage: cars, service groups and service records
//!
//! Every resource belongs to exactly one user. Handlers call [`check_owner`]
//! before touching a resource on behalf of the authenticated caller.

pub mod api;

pub use api::{GarageApiState, garage_api_router};

use crate::core::auth::AuthError;
use crate::core::db::models::{OwnedResource, UserId};
use crate::core::db::repositories::{GarageRepositoryError, GarageStore};

impl From<GarageRepositoryError> for AuthError {
    fn from(err: GarageRepositoryError) -> Self {
        AuthError::InternalError(err.to_string())
    }
}

/// Fail with `Forbidden` unless `user_id` owns `resource`.
///
/// A missing resource is indistinguishable from a foreign one.
pub async fn check_owner(
    store: &dyn GarageStore,
    resource: OwnedResource,
    user_id: UserId,
) -> Result<(), AuthError> {
    match store.owner_of(resource).await? {
        Some(owner) if owner == user_id => Ok(()),
        _ => {
            tracing::debug!(user_id, %resource, "ownership check failed");
            Err(AuthError::Forbidden)
        }
    }
}
