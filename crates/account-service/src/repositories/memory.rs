//! In-memory credential store.
//!
//! Backs unit and integration tests, and `CREDENTIAL_STORE=memory` for local
//! runs. Contents are lost on restart.

use crate::errors::AcError;
use crate::models::{normalize_email, NewUser, Role, User, ValidationFailure};
use crate::repositories::CredentialStore;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    memberships: HashMap<Uuid, BTreeSet<Role>>,
    roles: BTreeSet<Role>,
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    state: RwLock<State>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    /// Ids of every user currently holding `role`.
    pub async fn holders_of(&self, role: Role) -> Vec<Uuid> {
        let state = self.state.read().await;
        let mut holders: Vec<Uuid> = state
            .memberships
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(user_id, _)| *user_id)
            .collect();
        holders.sort();
        holders
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AcError> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AcError> {
        let wanted = normalize_email(email);
        let state = self.state.read().await;
        let mut matches = state
            .users
            .values()
            .filter(|u| normalize_email(&u.email) == wanted);

        let first = matches.next().cloned();
        if matches.next().is_some() {
            return Err(AcError::Database(
                "More than one user shares the requested email".to_string(),
            ));
        }
        Ok(first)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AcError> {
        let login_name = new_user.login_name();
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.login_name == login_name) {
            return Err(AcError::validation(ValidationFailure::DuplicateEmail {
                email: new_user.profile.email,
            }));
        }

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            login_name,
            email: new_user.profile.email.trim().to_string(),
            display_name: new_user.profile.display_name,
            phone: new_user.profile.phone,
            password_hash: new_user.password_hash,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<(), AcError> {
        let mut state = self.state.write().await;
        let stored = state
            .users
            .get_mut(&user.user_id)
            .ok_or_else(|| AcError::NotFound("User not found".to_string()))?;

        stored.email = user.email.trim().to_string();
        stored.display_name = user.display_name.clone();
        stored.phone = user.phone.clone();
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, AcError> {
        let mut state = self.state.write().await;
        state.memberships.remove(&user_id);
        Ok(state.users.remove(&user_id).is_some())
    }

    async fn get_roles(&self, user_id: Uuid) -> Result<BTreeSet<Role>, AcError> {
        let state = self.state.read().await;
        Ok(state.memberships.get(&user_id).cloned().unwrap_or_default())
    }

    async fn add_to_role(&self, user_id: Uuid, role: Role) -> Result<(), AcError> {
        let mut state = self.state.write().await;
        add_locked(&mut state, user_id, role)
    }

    async fn remove_from_role(&self, user_id: Uuid, role: Role) -> Result<(), AcError> {
        let mut state = self.state.write().await;
        if let Some(roles) = state.memberships.get_mut(&user_id) {
            roles.remove(&role);
        }
        Ok(())
    }

    async fn users_in_role(&self, role: Role) -> Result<Vec<Uuid>, AcError> {
        Ok(self.holders_of(role).await)
    }

    async fn role_exists(&self, role: Role) -> Result<bool, AcError> {
        Ok(self.state.read().await.roles.contains(&role))
    }

    async fn create_role(&self, role: Role) -> Result<bool, AcError> {
        Ok(self.state.write().await.roles.insert(role))
    }

    async fn move_role(&self, from: Uuid, to: Uuid, role: Role) -> Result<(), AcError> {
        let mut state = self.state.write().await;
        // Validate before touching `from` so a failure leaves both users as they were.
        if !state.roles.contains(&role) {
            return Err(AcError::NotFound(format!("Role {} does not exist", role)));
        }
        if !state.users.contains_key(&to) {
            return Err(AcError::NotFound("User not found".to_string()));
        }

        let removed = state
            .memberships
            .get_mut(&from)
            .is_some_and(|roles| roles.remove(&role));
        if !removed {
            return Err(AcError::InsufficientPermission(format!(
                "Source user does not hold {}",
                role
            )));
        }
        add_locked(&mut state, to, role)
    }
}

fn add_locked(state: &mut State, user_id: Uuid, role: Role) -> Result<(), AcError> {
    if !state.roles.contains(&role) {
        return Err(AcError::NotFound(format!("Role {} does not exist", role)));
    }
    if !state.users.contains_key(&user_id) {
        return Err(AcError::NotFound("User not found".to_string()));
    }
    state.memberships.entry(user_id).or_default().insert(role);
    Ok(())
}
