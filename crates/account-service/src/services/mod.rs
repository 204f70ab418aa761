//! Business logic for accounts, roles and tokens.

pub mod account_service;
pub mod role_registry;
pub mod token_service;
