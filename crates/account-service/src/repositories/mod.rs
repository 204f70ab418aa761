//! Credential store access.
//!
//! [`CredentialStore`] is the seam between the account manager and whatever
//! persists users and role memberships. Two implementations ship:
//! [`PgCredentialStore`] for PostgreSQL and [`InMemoryCredentialStore`] for
//! tests and local runs.

pub mod memory;
pub mod users;

pub use memory::InMemoryCredentialStore;
pub use users::PgCredentialStore;

use crate::crypto;
use crate::errors::AcError;
use crate::models::{NewUser, Role, User};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Users and role memberships.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AcError>;

    /// Case-insensitive email lookup.
    ///
    /// Profile updates can leave two accounts sharing an email; lookup then
    /// fails rather than picking one.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AcError>;

    /// Insert a user. A login name that is already taken is rejected with
    /// `ValidationFailure::DuplicateEmail`.
    async fn create(&self, new_user: NewUser) -> Result<User, AcError>;

    /// Persist the profile fields of an existing user.
    async fn update(&self, user: &User) -> Result<(), AcError>;

    /// Remove a user and all role memberships. Returns false if absent.
    async fn delete(&self, user_id: Uuid) -> Result<bool, AcError>;

    async fn get_roles(&self, user_id: Uuid) -> Result<BTreeSet<Role>, AcError>;

    /// Fails with `NotFound` if the role has not been created.
    async fn add_to_role(&self, user_id: Uuid, role: Role) -> Result<(), AcError>;

    async fn remove_from_role(&self, user_id: Uuid, role: Role) -> Result<(), AcError>;

    /// Ids of every user holding `role`, sorted.
    async fn users_in_role(&self, role: Role) -> Result<Vec<Uuid>, AcError>;

    async fn role_exists(&self, role: Role) -> Result<bool, AcError>;

    /// Create a role. Returns false if it already existed.
    async fn create_role(&self, role: Role) -> Result<bool, AcError>;

    /// Liveness of the backing store, for readiness probes.
    async fn ping(&self) -> Result<(), AcError> {
        Ok(())
    }

    /// Compare a plaintext password with the user's stored hash.
    fn verify_password(&self, user: &User, password: &str) -> Result<bool, AcError> {
        crypto::verify_password(password, &user.password_hash)
    }

    /// Move `role` from one user to another.
    ///
    /// The default is two independent steps; a failure between them leaves
    /// neither user holding the role. Stores that can apply both under one
    /// transaction or lock override this, and then also refuse with
    /// `InsufficientPermission` when `from` no longer holds the role.
    async fn move_role(&self, from: Uuid, to: Uuid, role: Role) -> Result<(), AcError> {
        self.remove_from_role(from, role).await?;
        self.add_to_role(to, role).await
    }
}
