use chrono::{DateTime, Utc};
use common::secret::SecretString;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fixed catalog of roles.
///
/// The string names are part of the token contract and the database schema;
/// they must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Owner,
    GOStaff,
    Pilot,
    Stewardess,
}

impl Role {
    /// Every role, in seeding order.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Owner,
        Role::GOStaff,
        Role::Pilot,
        Role::Stewardess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Owner => "Owner",
            Role::GOStaff => "GOStaff",
            Role::Pilot => "Pilot",
            Role::Stewardess => "Stewardess",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("Invalid role: {}", s))
    }
}

/// Mutable profile fields of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: String,
    pub email: String,
    pub phone: String,
}

/// A stored account (maps to the users table).
///
/// `login_name` is the normalized email captured at registration and is the
/// unique key. `email` is a profile field and may later change.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub login_name: String,
    pub email: String,
    pub display_name: String,
    pub phone: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("user_id", &self.user_id)
            .field("login_name", &self.login_name)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("phone", &self.phone)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    /// Overwrite the profile fields and bump `updated_at`.
    pub fn apply_profile(&mut self, profile: UserProfile) {
        self.display_name = profile.display_name;
        self.email = profile.email.trim().to_string();
        self.phone = profile.phone;
        self.updated_at = Utc::now();
    }
}

/// Data needed to insert a new account.
#[derive(Clone)]
pub struct NewUser {
    pub profile: UserProfile,
    pub password_hash: String,
}

impl NewUser {
    /// Unique login key derived from the registration email.
    pub fn login_name(&self) -> String {
        normalize_email(&self.profile.email)
    }
}

/// Case-insensitive form used for every email comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("profile", &self.profile)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// A single reason a registration was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    InvalidEmail { email: String },
    DuplicateEmail { email: String },
    PasswordTooShort { min_length: usize },
    PasswordRequiresDigit,
    PasswordRequiresLower,
    PasswordRequiresUpper,
    PasswordRequiresNonAlphanumeric,
}

impl ValidationFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationFailure::InvalidEmail { .. } => "InvalidEmail",
            ValidationFailure::DuplicateEmail { .. } => "DuplicateEmail",
            ValidationFailure::PasswordTooShort { .. } => "PasswordTooShort",
            ValidationFailure::PasswordRequiresDigit => "PasswordRequiresDigit",
            ValidationFailure::PasswordRequiresLower => "PasswordRequiresLower",
            ValidationFailure::PasswordRequiresUpper => "PasswordRequiresUpper",
            ValidationFailure::PasswordRequiresNonAlphanumeric => {
                "PasswordRequiresNonAlphanumeric"
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            ValidationFailure::InvalidEmail { email } => format!("Email '{}' is invalid.", email),
            ValidationFailure::DuplicateEmail { email } => {
                format!("Email '{}' is already taken.", email)
            }
            ValidationFailure::PasswordTooShort { min_length } => {
                format!("Passwords must be at least {} characters.", min_length)
            }
            ValidationFailure::PasswordRequiresDigit => {
                "Passwords must have at least one digit ('0'-'9').".to_string()
            }
            ValidationFailure::PasswordRequiresLower => {
                "Passwords must have at least one lowercase ('a'-'z').".to_string()
            }
            ValidationFailure::PasswordRequiresUpper => {
                "Passwords must have at least one uppercase ('A'-'Z').".to_string()
            }
            ValidationFailure::PasswordRequiresNonAlphanumeric => {
                "Passwords must have at least one non alphanumeric character.".to_string()
            }
        }
    }
}

impl Serialize for ValidationFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationFailure", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("description", &self.description())?;
        state.end()
    }
}

/// Authenticated caller, derived from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub roles: BTreeSet<Role>,
}

/// Per-request session state held by the calling context.
///
/// Signing out clears it; tokens already handed out stay valid until expiry.
#[derive(Debug, Clone, Default)]
pub struct Session {
    principal: Option<Principal>,
}

impl Session {
    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Drop the principal, returning it if one was present.
    pub fn clear(&mut self) -> Option<Principal> {
        self.principal.take()
    }
}

/// Signed bearer token handed back after a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub display_name: String,
    pub email: String,
    pub phone: String,
    pub password: SecretString,
}

/// Sign-in request body.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: SecretString,
}

/// Owner transfer request body. The acting user comes from the token.
#[derive(Debug, Deserialize)]
pub struct TransferOwnerRequest {
    pub new_owner_id: Uuid,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub phone: String,
    pub roles: Vec<Role>,
}

impl AccountResponse {
    pub fn new(user: &User, roles: &BTreeSet<Role>) -> Self {
        Self {
            user_id: user.user_id,
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            roles: roles.iter().copied().collect(),
        }
    }
}
