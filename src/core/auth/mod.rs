//! Authentication module for servicebook
//!
//! This module provides authentication functionality including:
//! - Salted password hashing
//! - JWT access/refresh token generation and validation
//! - Session epochs with refresh-token rotation
//! - Bearer-token middleware for protected routes
//! - REST API endpoints for auth operations

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use api::{ApiError, AuthApiState, auth_api_router};
pub use jwt::{Claims, Expiry, JwtConfig, JwtError, JwtService, SigningMode, TokenPair, TokenType};
pub use middleware::{AuthenticatedUser, require_auth};
pub use password::{BcryptHasher, HashError, PasswordHasher, Sha256Hasher};
pub use service::{AuthError, AuthService, ChangePasswordRequest, LoginRequest, RefreshRequest};
