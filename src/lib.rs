//! servicebook - vehicle service-book backend
//!
//! REST API for mobile clients tracking cars and their maintenance history,
//! with email registration and JWT session authentication.

pub mod app;
pub mod core;
