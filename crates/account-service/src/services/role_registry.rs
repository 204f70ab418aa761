//! Role catalog seeding.
//!
//! Every role in [`Role::ALL`] must exist before any membership is granted.
//! [`seed_roles`] is the only way to obtain a [`SeededRoles`], and
//! [`AccountManager::new`](crate::services::account_service::AccountManager::new)
//! requires one, so an account manager cannot be built ahead of seeding.

use crate::errors::AcError;
use crate::models::Role;
use crate::observability::metrics::set_roles_seeded;
use crate::repositories::CredentialStore;
use tracing::instrument;

/// Proof that the role catalog has been materialized in the store.
#[derive(Debug, Clone, Copy)]
pub struct SeededRoles {
    created: usize,
}

impl SeededRoles {
    /// Roles created by this seeding run (0 when all already existed).
    pub fn created(&self) -> usize {
        self.created
    }
}

/// Create each catalog role that does not exist yet.
///
/// Idempotent. Any store error aborts seeding and the caller must not serve.
#[instrument(skip_all)]
pub async fn seed_roles(store: &dyn CredentialStore) -> Result<SeededRoles, AcError> {
    let mut created = 0;

    for role in Role::ALL {
        if store.role_exists(role).await? {
            continue;
        }
        if store.create_role(role).await? {
            tracing::info!(target: "ac.services.role_registry", role = %role, "Created role");
            created += 1;
        }
    }

    set_roles_seeded(Role::ALL.len());
    tracing::info!(
        target: "ac.services.role_registry",
        created = created,
        total = Role::ALL.len(),
        "Role catalog seeded"
    );

    Ok(SeededRoles { created })
}
