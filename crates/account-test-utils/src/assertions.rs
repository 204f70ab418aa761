//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions over issued access tokens. Tokens are
//! decoded without signature checks; use `TokenVerifier` for that.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use common::jwt::AccessClaims;
use serde::Deserialize;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let parts: Vec<_> = token.split('.').collect();
    assert_eq!(
        parts.len(),
        3,
        "JWT must have 3 parts (header.payload.signature), got {}",
        parts.len()
    );
    URL_SAFE_NO_PAD
        .decode(parts[index])
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {}: {}", index, e))
}

/// Decode the claims of a token without verifying it.
pub fn decode_claims(token: &str) -> AccessClaims {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims")
}

/// Custom assertions for access tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_has_role("Pilot")
///     .assert_for_email("alice@x.com");
/// ```
pub trait TokenAssertions {
    /// Assert HS512 header and parseable claims
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the role claim contains `role`
    fn assert_has_role(&self, role: &str) -> &Self;

    /// Assert that the role claim does not contain `role`
    fn assert_lacks_role(&self, role: &str) -> &Self;

    /// Assert that the token expires within the specified seconds
    fn assert_expires_in(&self, seconds: u64) -> &Self;

    /// Assert the subject email claim
    fn assert_for_email(&self, email: &str) -> &Self;

    /// Assert the subject user id claim
    fn assert_for_user(&self, user_id: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let header: JwtHeader =
            serde_json::from_slice(&segment(self, 0)).expect("Failed to parse JWT header JSON");
        assert_eq!(header.alg, "HS512", "Expected HS512 algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");

        decode_claims(self);
        self
    }

    fn assert_has_role(&self, role: &str) -> &Self {
        let claims = decode_claims(self);
        assert!(
            claims.has_role(role),
            "Token does not contain role '{}'. Available roles: {:?}",
            role,
            claims.roles.iter().collect::<Vec<_>>()
        );
        self
    }

    fn assert_lacks_role(&self, role: &str) -> &Self {
        let claims = decode_claims(self);
        assert!(!claims.has_role(role), "Token unexpectedly contains role '{}'", role);
        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let claims = decode_claims(self);
        let remaining = claims.exp - Utc::now().timestamp();
        assert!(
            remaining > 0 && remaining <= seconds as i64,
            "Token expires in {}s, expected at most {}s",
            remaining,
            seconds
        );
        self
    }

    fn assert_for_email(&self, email: &str) -> &Self {
        assert_eq!(decode_claims(self).email, email, "Email claim mismatch");
        self
    }

    fn assert_for_user(&self, user_id: &str) -> &Self {
        assert_eq!(decode_claims(self).user_id, user_id, "User id claim mismatch");
        self
    }
}
