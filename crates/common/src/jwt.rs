//! Access-token claims and verification.
//!
//! The account service mints HS512 bearer tokens; any service that authorizes
//! requests verifies them with [`TokenVerifier`]. Both sides use the claim
//! schema defined here, so claim names, issuer and audience agree byte for
//! byte.
//!
//! # Claim names
//!
//! Identity claims use the WS-* claim type URIs understood by the existing
//! flight-document API:
//!
//! | Field      | JSON name                 |
//! |------------|---------------------------|
//! | `email`    | [`CLAIM_EMAIL`]           |
//! | `user_id`  | [`CLAIM_NAME_IDENTIFIER`] |
//! | `roles`    | [`CLAIM_ROLE`]            |
//! | `jti`, `exp`, `iss`, `aud` | registered JWT names |
//!
//! A single role serializes as a string, several roles as an array, and the
//! claim is omitted when the subject holds no role.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Maximum accepted token size in bytes, checked before any parsing.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Signing algorithm for access tokens (HMAC over SHA-512).
pub const ACCESS_TOKEN_ALGORITHM: Algorithm = Algorithm::HS512;

/// Claim type URI carrying the subject's email.
pub const CLAIM_EMAIL: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";

/// Claim type URI carrying the subject's user identifier.
pub const CLAIM_NAME_IDENTIFIER: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";

/// Claim type URI carrying role memberships.
pub const CLAIM_ROLE: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// Errors that can occur during access-token verification.
///
/// Every variant renders the same message; the variant is only used for
/// debug logging and metrics labels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Bad structure, signature, algorithm, issuer or audience.
    #[error("The access token is invalid or expired")]
    InvalidToken,

    /// `exp` lies in the past.
    #[error("The access token is invalid or expired")]
    Expired,
}

impl JwtValidationError {
    /// Bounded label for metrics.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            JwtValidationError::TokenTooLarge => "too_large",
            JwtValidationError::InvalidToken => "invalid",
            JwtValidationError::Expired => "expired",
        }
    }
}

/// Set of role names carried by a token.
///
/// Names are deduplicated and kept in sorted order, so the same membership
/// set always produces the same claim value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleClaim(Vec<String>);

impl RoleClaim {
    /// Build a role claim from any collection of role names.
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        Self(unique.into_iter().collect())
    }

    /// True when the subject holds no role.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check membership of a role name.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|r| r == role)
    }

    /// Iterate over role names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Serialize for RoleClaim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for RoleClaim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(role) => RoleClaim::new([role]),
            OneOrMany::Many(roles) => RoleClaim::new(roles),
        })
    }
}

/// Claims embedded in every access token.
///
/// `email`, `user_id` and `jti` are redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject email (the login name).
    #[serde(rename = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress")]
    pub email: String,

    /// Unique token identifier, fresh on every issuance.
    pub jti: String,

    /// Subject user identifier.
    #[serde(rename = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier")]
    pub user_id: String,

    /// Role memberships at issuance time.
    #[serde(
        rename = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
        default,
        skip_serializing_if = "RoleClaim::is_empty"
    )]
    pub roles: RoleClaim,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issuer.
    pub iss: String,

    /// Audience.
    pub aud: String,
}

impl fmt::Debug for AccessClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessClaims")
            .field("email", &"[REDACTED]")
            .field("jti", &"[REDACTED]")
            .field("user_id", &"[REDACTED]")
            .field("roles", &self.roles)
            .field("exp", &self.exp)
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .finish()
    }
}

impl AccessClaims {
    /// Check whether the token carries a role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Verifies access tokens signed with the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    leeway_seconds: i64,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("decoding_key", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenVerifier {
    /// Create a verifier for the given shared secret, issuer and audience.
    ///
    /// Expiry is enforced with zero leeway unless [`Self::with_leeway`] is used.
    #[must_use]
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            leeway_seconds: 0,
        }
    }

    /// Tolerate clock drift when checking `exp`.
    #[must_use]
    pub fn with_leeway(mut self, leeway_seconds: i64) -> Self {
        self.leeway_seconds = leeway_seconds.max(0);
        self
    }

    /// Verify a token against the current wall clock.
    ///
    /// # Errors
    ///
    /// See [`Self::verify_at`].
    pub fn verify(&self, token: &str) -> Result<AccessClaims, JwtValidationError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify a token against an explicit `now` (Unix epoch seconds).
    ///
    /// # Errors
    ///
    /// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
    /// - `InvalidToken` - malformed, wrong algorithm, bad signature, issuer or audience
    /// - `Expired` - `exp` is earlier than `now` minus the leeway
    pub fn verify_at(&self, token: &str, now: i64) -> Result<AccessClaims, JwtValidationError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(JwtValidationError::TokenTooLarge);
        }

        let mut validation = Validation::new(ACCESS_TOKEN_ALGORITHM);
        // exp is compared against the caller's clock below
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);

        let token_data =
            decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(target: "common.jwt", error = %e, "Token verification failed");
                JwtValidationError::InvalidToken
            })?;

        if token_data.claims.exp < now - self.leeway_seconds {
            tracing::debug!(
                target: "common.jwt",
                exp = token_data.claims.exp,
                now = now,
                "Token rejected: expired"
            );
            return Err(JwtValidationError::Expired);
        }

        Ok(token_data.claims)
    }
}
