//! Database repositories for servicebook
//!
//! Repositories encapsulate data access behind traits so services receive
//! their storage as constructor arguments. PostgreSQL implementations live
//! next to in-memory ones.

pub mod credential;
pub mod garage;
pub mod memory;

pub use credential::{CredentialRepository, CredentialRepositoryError, CredentialStore};
pub use garage::{GarageRepository, GarageRepositoryError, GarageStore};
pub use memory::{InMemoryCredentialStore, InMemoryGarageStore};
