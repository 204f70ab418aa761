//! Test server harness for E2E testing
//!
//! Provides `TestAccountServer` for spawning real account service instances
//! over the in-memory credential store.

use crate::fixtures::test_config;
use account_service::config::Config;
use account_service::models::{AccountResponse, Role, TokenResponse};
use account_service::observability::metrics::init_metrics_recorder;
use account_service::repositories::{CredentialStore, InMemoryCredentialStore};
use account_service::routes::{self, AppState};
use account_service::services::account_service::AccountManager;
use account_service::services::role_registry::seed_roles;
use account_service::services::token_service::TokenIssuer;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Test harness for spawning the account service in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_sign_in_e2e() -> Result<(), anyhow::Error> {
///     let server = TestAccountServer::spawn().await?;
///     let response = server
///         .client()
///         .post(format!("{}/api/v1/account/signin", server.url()))
///         .json(&body)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 401);
///     Ok(())
/// }
/// ```
pub struct TestAccountServer {
    addr: SocketAddr,
    store: Arc<InMemoryCredentialStore>,
    config: Config,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestAccountServer {
    /// Spawn a new test server instance with a fresh in-memory store
    ///
    /// The server will:
    /// - Seed the role catalog
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_config(test_config()).await
    }

    /// Spawn with a custom configuration. The store backend setting is
    /// ignored; the harness always uses the in-memory store.
    pub async fn spawn_with_config(config: Config) -> Result<Self, anyhow::Error> {
        let store = Arc::new(InMemoryCredentialStore::new());
        let seeded = seed_roles(store.as_ref())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed roles: {}", e))?;

        let manager = AccountManager::new(
            store.clone(),
            TokenIssuer::from_config(&config),
            config.bcrypt_cost,
            seeded,
        );

        let state = Arc::new(AppState {
            manager: Arc::new(manager),
            config: config.clone(),
        });

        // The global recorder can only be installed once per process; later
        // servers get a standalone handle.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            store,
            config,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Direct access to the backing store, for arranging state a public
    /// endpoint cannot (e.g. granting the first Owner).
    pub fn store(&self) -> &Arc<InMemoryCredentialStore> {
        &self.store
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn register(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountResponse, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/api/v1/account/signup/{}", self.url(), path))
            .json(&json!({
                "display_name": "Test User",
                "email": email,
                "phone": "555-0100",
                "password": password,
            }))
            .send()
            .await?;

        anyhow::ensure!(
            response.status() == 201,
            "Registration failed with status {}",
            response.status()
        );
        Ok(response.json().await?)
    }

    /// Register through `/signup/pilot`
    pub async fn register_pilot(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountResponse, anyhow::Error> {
        self.register("pilot", email, password).await
    }

    /// Register through `/signup/admin`
    pub async fn register_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountResponse, anyhow::Error> {
        self.register("admin", email, password).await
    }

    /// Sign in and return the access token
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/api/v1/account/signin", self.url()))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        anyhow::ensure!(
            response.status() == 200,
            "Sign-in failed with status {}",
            response.status()
        );
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Grant Owner directly in the store
    pub async fn grant_owner(&self, user_id: Uuid) -> Result<(), anyhow::Error> {
        self.store
            .add_to_role(user_id, Role::Owner)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to grant Owner: {}", e))
    }
}

impl Drop for TestAccountServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
