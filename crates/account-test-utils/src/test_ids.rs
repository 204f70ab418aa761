//! Fixed test IDs for deterministic tests
//!
//! Used where a test needs an id that no store will ever have handed out.

use uuid::Uuid;

// User IDs (100-199)
pub const TEST_USER_ALICE: Uuid = Uuid::from_u128(100);
pub const TEST_USER_BOB: Uuid = Uuid::from_u128(101);

/// An id that never belongs to a registered account.
pub const TEST_USER_MISSING: Uuid = Uuid::from_u128(0xdead);

// Emails
pub const TEST_EMAIL_ALICE: &str = "alice@x.com";
pub const TEST_EMAIL_BOB: &str = "bob@x.com";
pub const TEST_EMAIL_CAROL: &str = "carol@x.com";

/// Satisfies the password policy.
pub const TEST_PASSWORD: &str = "Secret1!";
