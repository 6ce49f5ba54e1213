//! bcrypt password hashing and verification.

use crate::error::{Error, Result};

/// Hash a plaintext password with bcrypt at the given cost factor
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).map_err(|e| Error::Internal(format!("bcrypt hash failed: {}", e)))
}

/// Verify a plaintext password against a stored bcrypt hash
///
/// Returns `Ok(false)` on mismatch; `Err` only when the stored hash itself
/// is malformed.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool> {
    bcrypt::verify(password, hashed)
        .map_err(|e| Error::Internal(format!("bcrypt verify failed: {}", e)))
}
