//! FlightDocs account and access-control service.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Password hashing
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer authentication and HTTP metrics
//! - `models` - Roles, users, sessions and request/response bodies
//! - `observability` - Log field hashing and metrics
//! - `repositories` - Credential store trait and implementations
//! - `routes` - Router and shared state
//! - `services` - Account manager, role seeding and token issuance

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
