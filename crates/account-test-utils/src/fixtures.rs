//! Test configuration and token-signing fixtures.

use account_service::config::{Config, StoreBackend, MIN_BCRYPT_COST};
use common::secret::SecretString;

/// Signing secret used by every test server.
pub const TEST_JWT_SECRET: &str = "flightdocs-test-secret-0123456789-abcdefghijklmnop";
pub const TEST_JWT_ISSUER: &str = "https://flightdocs.test";
pub const TEST_JWT_AUDIENCE: &str = "flightdocs-clients";

/// Configuration for an in-memory test server.
///
/// Uses the lowest accepted bcrypt cost to keep tests fast.
pub fn test_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        database_url: None,
        bind_address: "127.0.0.1:0".to_string(),
        jwt_secret: SecretString::from(TEST_JWT_SECRET),
        jwt_issuer: TEST_JWT_ISSUER.to_string(),
        jwt_audience: TEST_JWT_AUDIENCE.to_string(),
        token_lifetime_minutes: 20,
        bcrypt_cost: MIN_BCRYPT_COST,
    }
}
