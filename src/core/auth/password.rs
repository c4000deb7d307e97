//! Password hashing
//!
//! Passwords are stored as a salted digest next to the salt that produced it.
//! Verification always recomputes the digest with the stored salt and compares
//! the result in constant time.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Default cost factor for bcrypt hashing
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Password hashing errors
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("Invalid salt length: expected {SALT_LEN} bytes, got {0}")]
    InvalidSalt(usize),

    #[error("Password hashing failed: {0}")]
    HashingError(String),
}

/// Deterministic salted password digest.
///
/// The same `(password, salt)` pair must always produce the same digest.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str, salt: &[u8]) -> Result<Vec<u8>, HashError>;

    /// Recompute the digest and compare it with `expected` in constant time
    fn verify(&self, password: &str, salt: &[u8], expected: &[u8]) -> Result<bool, HashError> {
        let actual = self.hash(password, salt)?;
        Ok(constant_time_eq(&actual, expected))
    }
}

/// Generate a fresh salt from the operating system CSPRNG
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Hash a new password under a freshly generated salt.
///
/// Returns `(digest, salt)`; both are stored together.
pub fn hash_with_new_salt(
    hasher: &dyn PasswordHasher,
    password: &str,
) -> Result<(Vec<u8>, [u8; SALT_LEN]), HashError> {
    let salt = generate_salt();
    let digest = hasher.hash(password, &salt)?;
    Ok((digest, salt))
}

/// SHA-256 over `salt || password`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl PasswordHasher for Sha256Hasher {
    fn hash(&self, password: &str, salt: &[u8]) -> Result<Vec<u8>, HashError> {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        Ok(hasher.finalize().to_vec())
    }
}

/// bcrypt keyed by the stored salt instead of an embedded random one
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str, salt: &[u8]) -> Result<Vec<u8>, HashError> {
        let salt: [u8; SALT_LEN] = salt
            .try_into()
            .map_err(|_| HashError::InvalidSalt(salt.len()))?;

        let parts = bcrypt::hash_with_salt(password, self.cost, salt)
            .map_err(|e| HashError::HashingError(e.to_string()))?;

        Ok(parts.to_string().into_bytes())
    }
}

/// Constant-time byte comparison.
///
/// Length is not secret here; digests of one algorithm share a fixed length.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
