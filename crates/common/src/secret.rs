//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for passwords and the token signing
//! secret. `SecretString` implements `Debug` with redaction, so a struct that
//! derives `Debug` while holding one stays safe to log.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct SignInRequest {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let req = SignInRequest {
//!     email: "alice@x.com".to_string(),
//!     password: SecretString::from("Secret1!"),
//! };
//!
//! assert!(!format!("{req:?}").contains("Secret1!"));
//! assert_eq!(req.password.expose_secret(), "Secret1!");
//! ```
//!
//! Use `SecretString` for user passwords, the JWT signing secret and issued
//! bearer tokens held in memory.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
