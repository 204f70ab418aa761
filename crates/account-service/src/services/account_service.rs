//! Account lifecycle, sign-in and Owner transfer.
//!
//! [`AccountManager`] is the only writer of users and role memberships. It
//! talks to a [`CredentialStore`] and hands verified identities to a
//! [`TokenIssuer`].
//!
//! # Security
//!
//! - Unknown email and wrong password fail through one constructor with one
//!   message, and both run a bcrypt verification
//! - Emails are logged as correlation hashes only
//! - Owner transfers are serialized in-process and verify the target first
//! - The Owner account cannot be deleted

use crate::crypto::{self, DUMMY_PASSWORD_HASH};
use crate::errors::AcError;
use crate::models::{
    NewUser, Principal, Role, Session, TokenResponse, User, UserProfile, ValidationFailure,
};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{
    record_account_operation, record_owner_transfer, record_registration, record_sign_in,
};
use crate::repositories::CredentialStore;
use crate::services::role_registry::SeededRoles;
use crate::services::token_service::TokenIssuer;
use chrono::Utc;
use common::secret::{ExposeSecret, SecretString};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

pub struct AccountManager {
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    bcrypt_cost: u32,
    /// Held across the Owner check and the move.
    ownership: Mutex<()>,
}

impl AccountManager {
    /// Build a manager. Requires proof that the role catalog was seeded.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: TokenIssuer,
        bcrypt_cost: u32,
        _seeded: SeededRoles,
    ) -> Self {
        Self {
            store,
            issuer,
            bcrypt_cost,
            ownership: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Create an account and grant it `role`.
    ///
    /// Input problems come back together as `AcError::Validation`. A taken
    /// email is reported by the store.
    #[instrument(skip_all, fields(role = %role))]
    pub async fn register_account(
        &self,
        profile: UserProfile,
        password: &SecretString,
        role: Role,
    ) -> Result<User, AcError> {
        let mut failures = Vec::new();
        if let Some(failure) = validate_email(&profile.email) {
            failures.push(failure);
        }
        failures.extend(validate_password(password.expose_secret()));
        if !failures.is_empty() {
            record_registration(role.as_str(), "error");
            tracing::debug!(
                target: "ac.services.account",
                failures = failures.len(),
                "Registration rejected by validation"
            );
            return Err(AcError::Validation(failures));
        }

        let password_hash = crypto::hash_password(password.expose_secret(), self.bcrypt_cost)?;
        let email_hash = hash_for_correlation(&profile.email);

        let user = self
            .store
            .create(NewUser {
                profile,
                password_hash,
            })
            .await
            .inspect_err(|e| {
                record_registration(role.as_str(), "error");
                tracing::info!(
                    target: "ac.services.account",
                    email_hash = %email_hash,
                    error = %e,
                    "Account creation rejected"
                );
            })?;

        if let Err(e) = self.grant_role(user.user_id, role).await {
            tracing::error!(
                target: "ac.services.account",
                user_id = %user.user_id,
                error = %e,
                "Failed to grant role to new account, removing it"
            );
            if let Err(cleanup) = self.store.delete(user.user_id).await {
                tracing::error!(
                    target: "ac.services.account",
                    user_id = %user.user_id,
                    error = %cleanup,
                    "Failed to remove account without role"
                );
            }
            record_registration(role.as_str(), "error");
            return Err(e);
        }

        record_registration(role.as_str(), "success");
        tracing::info!(
            target: "ac.services.account",
            user_id = %user.user_id,
            email_hash = %email_hash,
            "Account registered"
        );

        Ok(user)
    }

    /// Grant a role, creating it first if the catalog lacks it.
    async fn grant_role(&self, user_id: Uuid, role: Role) -> Result<(), AcError> {
        if !self.store.role_exists(role).await? {
            self.store.create_role(role).await?;
        }
        self.store.add_to_role(user_id, role).await
    }

    /// Check credentials and mint an access token.
    ///
    /// Every authentication failure is `AcError::invalid_credentials()`.
    #[instrument(skip_all)]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<TokenResponse, AcError> {
        let start = Instant::now();
        let result = self.sign_in_inner(email, password).await;

        let status = if result.is_ok() { "success" } else { "error" };
        record_sign_in(status, start.elapsed());

        result
    }

    async fn sign_in_inner(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<TokenResponse, AcError> {
        let email_hash = hash_for_correlation(email);
        let user = self.store.find_by_email(email).await?;

        // Verify against a dummy hash when the email is unknown so both
        // failures cost one bcrypt verification.
        let valid = match &user {
            Some(user) => self.store.verify_password(user, password.expose_secret())?,
            None => {
                let _ = crypto::verify_password(password.expose_secret(), DUMMY_PASSWORD_HASH);
                false
            }
        };

        let Some(user) = user.filter(|_| valid) else {
            tracing::info!(
                target: "ac.services.account",
                email_hash = %email_hash,
                "Sign-in failed"
            );
            return Err(AcError::invalid_credentials());
        };

        let roles = self.store.get_roles(user.user_id).await?;
        let access_token =
            self.issuer
                .issue(&user.email, user.user_id, roles, Utc::now().timestamp())?;

        tracing::info!(
            target: "ac.services.account",
            user_id = %user.user_id,
            "Access token issued"
        );

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.issuer.lifetime_seconds().unsigned_abs(),
        })
    }

    /// Move the Owner role from `acting_user_id` to `target_user_id`.
    ///
    /// The acting user must hold Owner. The target must exist before
    /// anything changes. If the move fails and the store shows nobody
    /// holding Owner, the acting user gets it back. When that restore fails,
    /// or the store cannot say who holds Owner, the result is
    /// `AcError::OwnerTransferIncomplete` and an operator must check Owner.
    #[instrument(skip_all, fields(acting_user_id = %acting_user_id, target_user_id = %target_user_id))]
    pub async fn transfer_owner_role(
        &self,
        acting_user_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<(), AcError> {
        let _guard = self.ownership.lock().await;

        let acting_roles = self.store.get_roles(acting_user_id).await?;
        if !acting_roles.contains(&Role::Owner) {
            record_owner_transfer("rejected");
            tracing::warn!(
                target: "ac.services.account",
                "Owner transfer attempted by a user without Owner"
            );
            return Err(AcError::InsufficientPermission(
                "Only the current Owner can transfer the Owner role".to_string(),
            ));
        }

        if acting_user_id == target_user_id {
            record_owner_transfer("success");
            return Ok(());
        }

        if self.store.find_by_id(target_user_id).await?.is_none() {
            record_owner_transfer("rejected");
            return Err(AcError::NotFound("Target user not found".to_string()));
        }

        match self
            .store
            .move_role(acting_user_id, target_user_id, Role::Owner)
            .await
        {
            Ok(()) => {
                record_owner_transfer("success");
                tracing::info!(target: "ac.services.account", "Owner role transferred");
                Ok(())
            }
            // The store refused before changing anything: another transfer
            // already took Owner from the acting user.
            Err(e @ AcError::InsufficientPermission(_)) => {
                record_owner_transfer("rejected");
                tracing::warn!(
                    target: "ac.services.account",
                    "Owner moved by a concurrent transfer"
                );
                Err(e)
            }
            Err(e) => self.recover_owner(acting_user_id, target_user_id, e).await,
        }
    }

    /// After a failed move, restore Owner to the acting user only if no
    /// user holds it.
    async fn recover_owner(
        &self,
        acting_user_id: Uuid,
        target_user_id: Uuid,
        cause: AcError,
    ) -> Result<(), AcError> {
        let holders = match self.store.users_in_role(Role::Owner).await {
            Ok(holders) => holders,
            Err(read) => {
                record_owner_transfer("incomplete");
                tracing::error!(
                    target: "ac.services.account",
                    error = %cause,
                    read_error = %read,
                    "Owner transfer failed and Owner holders could not be read"
                );
                return Err(AcError::OwnerTransferIncomplete);
            }
        };

        if holders == [target_user_id] {
            record_owner_transfer("success");
            tracing::warn!(
                target: "ac.services.account",
                error = %cause,
                "Owner move reported failure but the target holds Owner"
            );
            return Ok(());
        }

        if !holders.is_empty() {
            record_owner_transfer("error");
            tracing::warn!(
                target: "ac.services.account",
                error = %cause,
                holders = holders.len(),
                "Owner transfer failed, Owner left in place"
            );
            return Err(cause);
        }

        match self.store.add_to_role(acting_user_id, Role::Owner).await {
            Ok(()) => {
                record_owner_transfer("error");
                tracing::warn!(
                    target: "ac.services.account",
                    error = %cause,
                    "Owner transfer failed, Owner restored to acting user"
                );
                Err(cause)
            }
            Err(restore) => {
                record_owner_transfer("incomplete");
                tracing::error!(
                    target: "ac.services.account",
                    error = %cause,
                    restore_error = %restore,
                    "Owner transfer failed and Owner could not be restored; no user holds Owner"
                );
                Err(AcError::OwnerTransferIncomplete)
            }
        }
    }

    /// Load a user together with its current role memberships.
    pub async fn account(&self, user_id: Uuid) -> Result<(User, BTreeSet<Role>), AcError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AcError::NotFound("User not found".to_string()))?;
        let roles = self.store.get_roles(user_id).await?;
        Ok((user, roles))
    }

    /// Overwrite display name, email and phone.
    ///
    /// The new email is not checked against other accounts, so two accounts
    /// can end up sharing one; sign-in by that email then fails.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        profile: UserProfile,
    ) -> Result<User, AcError> {
        let mut user = self.store.find_by_id(user_id).await?.ok_or_else(|| {
            record_account_operation("update_profile", "error");
            AcError::NotFound("User not found".to_string())
        })?;

        user.apply_profile(profile);
        self.store.update(&user).await.inspect_err(|_| {
            record_account_operation("update_profile", "error");
        })?;

        record_account_operation("update_profile", "success");
        tracing::info!(target: "ac.services.account", "Profile updated");
        Ok(user)
    }

    /// Remove an account and all of its role memberships.
    ///
    /// The current Owner is refused with `AcError::Conflict`. The check runs
    /// under the same lock as Owner transfers.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), AcError> {
        let not_found = || {
            record_account_operation("delete_account", "error");
            AcError::NotFound("User not found".to_string())
        };

        let _guard = self.ownership.lock().await;

        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(not_found());
        }
        if self.store.get_roles(user_id).await?.contains(&Role::Owner) {
            record_account_operation("delete_account", "rejected");
            tracing::info!(
                target: "ac.services.account",
                "Refused to delete the Owner account"
            );
            return Err(AcError::Conflict(
                "The Owner account cannot be deleted; transfer Owner first".to_string(),
            ));
        }
        if !self.store.delete(user_id).await? {
            return Err(not_found());
        }

        record_account_operation("delete_account", "success");
        tracing::info!(target: "ac.services.account", "Account deleted");
        Ok(())
    }

    /// Clear the caller's session. Tokens already issued stay valid until
    /// they expire. Returns the principal that was signed out, if any.
    pub fn sign_out(&self, session: &mut Session) -> Option<Principal> {
        let principal = session.clear();
        match &principal {
            Some(p) => {
                record_account_operation("sign_out", "success");
                tracing::info!(target: "ac.services.account", user_id = %p.user_id, "Signed out");
            }
            None => {
                record_account_operation("sign_out", "noop");
                tracing::debug!(target: "ac.services.account", "Sign-out without a session");
            }
        }
        principal
    }
}

/// Reject addresses without exactly one `@` separating non-empty parts, or
/// with whitespace.
pub fn validate_email(email: &str) -> Option<ValidationFailure> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    (!valid).then(|| ValidationFailure::InvalidEmail {
        email: email.to_string(),
    })
}

/// Password policy: at least [`MIN_PASSWORD_LENGTH`] characters with a
/// digit, a lower-case letter, an upper-case letter and a symbol.
pub fn validate_password(password: &str) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        failures.push(ValidationFailure::PasswordTooShort {
            min_length: MIN_PASSWORD_LENGTH,
        });
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        failures.push(ValidationFailure::PasswordRequiresDigit);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        failures.push(ValidationFailure::PasswordRequiresLower);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        failures.push(ValidationFailure::PasswordRequiresUpper);
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        failures.push(ValidationFailure::PasswordRequiresNonAlphanumeric);
    }

    failures
}
