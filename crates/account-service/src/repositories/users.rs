//! PostgreSQL credential store.
//!
//! Users live in `users`, the role catalog in `roles`, memberships in
//! `user_roles` (cascading on user delete). See `migrations/`.

use crate::errors::AcError;
use crate::models::{normalize_email, NewUser, Role, User, ValidationFailure};
use crate::repositories::CredentialStore;
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

const USER_COLUMNS: &str = r#"
    user_id, login_name, email, display_name, phone, password_hash,
    created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn map_membership_error(e: sqlx::Error, role: Role) -> AcError {
    if is_foreign_key_violation(&e) {
        AcError::NotFound(format!("User or role {} does not exist", role))
    } else {
        AcError::Database(format!("Failed to add user role: {}", e))
    }
}

#[async_trait::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AcError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AcError::Database(format!("Failed to fetch user by id: {}", e)))?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AcError> {
        let mut users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE lower(email) = $1 LIMIT 2",
            USER_COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AcError::Database(format!("Failed to fetch user by email: {}", e)))?;

        if users.len() > 1 {
            return Err(AcError::Database(
                "More than one user shares the requested email".to_string(),
            ));
        }
        Ok(users.pop())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AcError> {
        let login_name = new_user.login_name();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (login_name, email, display_name, phone, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&login_name)
        .bind(new_user.profile.email.trim())
        .bind(&new_user.profile.display_name)
        .bind(&new_user.profile.phone)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AcError::validation(ValidationFailure::DuplicateEmail {
                    email: new_user.profile.email.clone(),
                })
            } else {
                AcError::Database(format!("Failed to create user: {}", e))
            }
        })?;

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<(), AcError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, display_name = $3, phone = $4, updated_at = $5
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id)
        .bind(user.email.trim())
        .bind(&user.display_name)
        .bind(&user.phone)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AcError::Database(format!("Failed to update user: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AcError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, AcError> {
        // user_roles rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AcError::Database(format!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_roles(&self, user_id: Uuid) -> Result<BTreeSet<Role>, AcError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT role FROM user_roles WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AcError::Database(format!("Failed to fetch user roles: {}", e)))?;

        rows.into_iter()
            .map(|(name,)| Role::from_str(&name).map_err(AcError::Database))
            .collect()
    }

    async fn add_to_role(&self, user_id: Uuid, role: Role) -> Result<(), AcError> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_membership_error(e, role))?;

        Ok(())
    }

    async fn remove_from_role(&self, user_id: Uuid, role: Role) -> Result<(), AcError> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AcError::Database(format!("Failed to remove user role: {}", e)))?;

        Ok(())
    }

    async fn users_in_role(&self, role: Role) -> Result<Vec<Uuid>, AcError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM user_roles WHERE role = $1 ORDER BY user_id")
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AcError::Database(format!("Failed to fetch role members: {}", e)))?;

        Ok(rows.into_iter().map(|(user_id,)| user_id).collect())
    }

    async fn role_exists(&self, role: Role) -> Result<bool, AcError> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1)")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AcError::Database(format!("Failed to check role: {}", e)))?;

        Ok(exists.0)
    }

    async fn create_role(&self, role: Role) -> Result<bool, AcError> {
        let result = sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AcError::Database(format!("Failed to create role: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AcError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AcError::Database(format!("Database ping failed: {}", e)))?;
        Ok(())
    }

    /// Remove and add in one transaction; any failure rolls both back.
    ///
    /// Fails with `InsufficientPermission` if `from` does not hold `role`.
    async fn move_role(&self, from: Uuid, to: Uuid, role: Role) -> Result<(), AcError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AcError::Database(format!("Failed to begin transaction: {}", e)))?;

        // A concurrent move of the same membership blocks on this row and then
        // sees zero rows, so only one mover proceeds.
        let removed = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
            .bind(from)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| AcError::Database(format!("Failed to remove user role: {}", e)))?;

        if removed.rows_affected() == 0 {
            return Err(AcError::InsufficientPermission(format!(
                "Source user does not hold {}",
                role
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            "#,
        )
        .bind(to)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_membership_error(e, role))?;

        tx.commit()
            .await
            .map_err(|e| AcError::Database(format!("Failed to commit role move: {}", e)))?;

        Ok(())
    }
}
