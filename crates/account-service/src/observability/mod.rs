//! Observability for the account service.
//!
//! # Privacy by Default
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit safe field allow-listing.
//! Fields are categorized as:
//! - **SAFE**: Can be logged in plaintext (role names, operation types, user ids)
//! - **HASHED**: Must be SHA-256 hashed for correlation (email addresses)
//! - **NEVER**: Must never appear in logs (passwords, hashes, tokens, the signing secret)

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// Used for emails, which need correlation across log entries but should not
/// be written in plaintext.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.iter().take(4).copied().collect::<Vec<u8>>())
}

/// Error categories for metrics labels (bounded cardinality)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad sign-in or unusable bearer token
    Authentication,
    /// Caller lacks a required role
    Authorization,
    /// Rejected input (password policy, email)
    Validation,
    /// Everything else (database, hashing, system)
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&crate::errors::AcError> for ErrorCategory {
    fn from(err: &crate::errors::AcError) -> Self {
        use crate::errors::AcError;
        match err {
            AcError::InvalidCredentials | AcError::InvalidToken(_) => {
                ErrorCategory::Authentication
            }
            AcError::InsufficientPermission(_) => ErrorCategory::Authorization,
            AcError::Validation(_)
            | AcError::BadRequest(_)
            | AcError::NotFound(_)
            | AcError::Conflict(_) => ErrorCategory::Validation,
            AcError::Database(_)
            | AcError::Crypto(_)
            | AcError::OwnerTransferIncomplete
            | AcError::Internal => ErrorCategory::Internal,
        }
    }
}
