//! Session token minting and verification.
//!
//! # Purpose
//! Defines the claim structure and HS256 helpers for the bearer tokens the
//! portal issues at sign-in. Issuer and audience are fixed; the signing
//! secret and token lifetime come from configuration.
//!
//! # Key invariants
//! - `sub` is the identity store's user id; it is the only identity the
//!   server ever trusts from a client.
//! - Expired or otherwise invalid tokens are indistinguishable to callers:
//!   both surface as [`AuthError::InvalidToken`].
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

pub const ISSUER: &str = "portal-auth";
pub const AUDIENCE: &str = "portal";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid session token")]
    InvalidToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub aud: String,
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Signing material shared by the whole service.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Mint a session token for an authenticated identity.
    pub fn mint(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.mint_with_ttl(user_id, self.ttl)
    }

    fn mint_with_ttl(&self, user_id: Uuid, ttl: Duration) -> Result<String, AuthError> {
        let now = unix_now();
        let claims = SessionClaims {
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            sub: user_id,
            iat: now,
            exp: now + ttl.as_secs() as i64,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Verify a bearer token and return the session subject.
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(data.claims.sub)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}
