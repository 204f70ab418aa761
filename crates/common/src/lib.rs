//! Common utilities and types shared between the account service and the
//! request-authorization layer that consumes its bearer tokens.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for access-token claims and verification
pub mod jwt;
