//! Access-token issuance.
//!
//! Tokens are HS512 JWTs carrying the claims in [`common::jwt::AccessClaims`].
//! They are not stored and cannot be revoked; expiry is the only way out.

use crate::config::Config;
use crate::errors::AcError;
use crate::models::Role;
use crate::observability::metrics::record_token_issuance;
use common::jwt::{AccessClaims, RoleClaim, ACCESS_TOKEN_ALGORITHM};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::fmt;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// Default token lifetime.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(20 * 60);

/// Mints access tokens with a fixed issuer, audience and lifetime.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
    lifetime_seconds: i64,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("encoding_key", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime_seconds", &self.lifetime_seconds)
            .finish()
    }
}

impl TokenIssuer {
    /// Issuer with the default [`TOKEN_LIFETIME`]. The key is the secret's raw bytes.
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            lifetime_seconds: TOKEN_LIFETIME.as_secs() as i64,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret_bytes(),
            &config.jwt_issuer,
            &config.jwt_audience,
        )
        .with_lifetime_minutes(config.token_lifetime_minutes)
    }

    pub fn with_lifetime_minutes(mut self, minutes: i64) -> Self {
        self.lifetime_seconds = minutes * 60;
        self
    }

    pub fn lifetime_seconds(&self) -> i64 {
        self.lifetime_seconds
    }

    /// Sign a token for the subject.
    ///
    /// `roles` may contain duplicates and come in any order; the claim holds
    /// each distinct role once, sorted. `exp` is `now + lifetime` and a fresh
    /// `jti` is generated on every call.
    #[instrument(skip_all)]
    pub fn issue<I>(
        &self,
        email: &str,
        user_id: Uuid,
        roles: I,
        now: i64,
    ) -> Result<String, AcError>
    where
        I: IntoIterator<Item = Role>,
    {
        let claims = AccessClaims {
            email: email.to_string(),
            jti: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            roles: RoleClaim::new(roles.into_iter().map(|r| r.as_str())),
            exp: now + self.lifetime_seconds,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(
            &Header::new(ACCESS_TOKEN_ALGORITHM),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| {
            tracing::error!(target: "ac.services.token", error = %e, "Token signing failed");
            record_token_issuance("error");
            AcError::Crypto(format!("Token signing failed: {}", e))
        })?;

        record_token_issuance("success");
        Ok(token)
    }
}
