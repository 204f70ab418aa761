//! Password hashing.
//!
//! Passwords are stored as bcrypt hashes only. The cost factor comes from
//! configuration and is re-validated here so a direct caller cannot hash
//! below the floor.

use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::AcError;
use crate::observability::metrics::record_bcrypt_duration;
use std::time::Instant;
use tracing::instrument;

/// Hash verified in place of a stored one when the email is unknown, so an
/// unknown account costs the same bcrypt work as a wrong password.
pub const DUMMY_PASSWORD_HASH: &str = "$2b$12$LQv3c1yqBWVHxkd0LHAkCOYz6TtxMQJqhN8/LewY5GyYqExt7YD3a";

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns `AcError::Crypto` if `cost` is outside 10-14 or hashing fails.
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, AcError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(AcError::Crypto(format!(
            "Invalid bcrypt cost: {} (must be {}-{})",
            cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
        )));
    }

    let start = Instant::now();
    let hash = bcrypt::hash(password, cost)
        .map_err(|e| AcError::Crypto(format!("Password hashing failed: {}", e)))?;
    record_bcrypt_duration("hash", start.elapsed());

    Ok(hash)
}

/// Verify a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AcError> {
    let start = Instant::now();
    let valid = bcrypt::verify(password, hash)
        .map_err(|e| AcError::Crypto(format!("Password verification failed: {}", e)))?;
    record_bcrypt_duration("verify", start.elapsed());

    Ok(valid)
}
