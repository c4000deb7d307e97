//! Email registration and password recovery
//!
//! Both flows are confirmed by a short numeric code sent to the address.

pub mod api;
pub mod codes;
pub mod service;

pub use api::register_api_router;
pub use codes::{ConfirmationCodes, DEFAULT_CODE_TTL, InMemoryCodeCache};
pub use service::{ConfirmRequest, RegisterError, RegisterService, SendCodeRequest};
