//! # Account Test Utilities
//!
//! Shared test utilities for the account service.
//!
//! This crate provides:
//! - Fixed test IDs, credentials and a test configuration
//! - Server test harness (`TestAccountServer` for E2E tests)
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use account_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestAccountServer::spawn().await?;
//!     server.register_pilot("alice@x.com", TEST_PASSWORD).await?;
//!
//!     let token = server.sign_in("alice@x.com", TEST_PASSWORD).await?;
//!     token.assert_valid_jwt().assert_has_role("Pilot");
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod server_harness;
pub mod test_ids;

pub use assertions::*;
pub use fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
