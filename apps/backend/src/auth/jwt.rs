//! Stateless token lifecycle: minting, verification, and rotation.
//!
//! Both token types carry the same claim set and differ only in the secret
//! and TTL they are signed under. Nothing here touches external state;
//! validity is entirely signature + embedded expiry.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::identity::{Identity, Provider};
use crate::error::AppError;
use crate::state::security_config::SecurityConfig;

/// Claims included in our backend-issued tokens.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// External user identifier (standard JWT subject claim)
    pub sub: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub provider: Provider,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

/// Signed access + refresh token pair. Field names are camelCase on the
/// wire to match the browser client and the query-string transport.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn unix_seconds(now: SystemTime) -> Result<i64, AppError> {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .map_err(|_| AppError::internal("system clock is before the unix epoch"))
}

fn sign(
    claims: &TokenClaims,
    secret: &[u8],
    security: &SecurityConfig,
) -> Result<String, AppError> {
    encode(
        &Header::new(security.algorithm),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::internal(format!("failed to encode JWT: {e}")))
}

/// Mint a fresh access/refresh pair for an identity.
///
/// `exp` is always derived additively from the configured TTLs at mint
/// time, never copied from any input token.
pub fn mint_token_pair(
    identity: &Identity,
    provider: Provider,
    now: SystemTime,
    security: &SecurityConfig,
) -> Result<TokenPair, AppError> {
    let iat = unix_seconds(now)?;

    let access_claims = TokenClaims {
        sub: identity.id.clone(),
        email: identity.email.clone(),
        name: identity.name.clone(),
        provider,
        iat,
        exp: iat + security.access_ttl.as_secs() as i64,
    };
    let refresh_claims = TokenClaims {
        exp: iat + security.refresh_ttl.as_secs() as i64,
        ..access_claims.clone()
    };

    Ok(TokenPair {
        access_token: sign(&access_claims, &security.access_secret, security)?,
        refresh_token: sign(&refresh_claims, &security.refresh_secret, security)?,
    })
}

fn verify(token: &str, secret: &[u8], security: &SecurityConfig) -> Result<TokenClaims, AppError> {
    // Default Validation already checks exp; pin algorithm to configured algorithm.
    let validation = Validation::new(security.algorithm);

    decode::<TokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::unauthorized_expired_jwt()
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                AppError::unauthorized_invalid_jwt()
            }
            _ => AppError::unauthorized_invalid_jwt(),
        })
}

/// Verify an access token and return its claims. Gates protected routes.
pub fn verify_access_token(
    token: &str,
    security: &SecurityConfig,
) -> Result<TokenClaims, AppError> {
    verify(token, &security.access_secret, security)
}

/// Verify a refresh token and return its claims.
pub fn verify_refresh_token(
    token: &str,
    security: &SecurityConfig,
) -> Result<TokenClaims, AppError> {
    verify(token, &security.refresh_secret, security)
}

/// Exchange a valid refresh token for a brand-new token pair.
///
/// The surviving claims (`sub`, `email`, `name`, `provider`) are carried
/// over; `iat`/`exp` are discarded and re-derived. The previous refresh
/// token stays valid until its own expiry; this service keeps no state
/// with which to revoke it.
pub fn rotate(
    refresh_token: &str,
    now: SystemTime,
    security: &SecurityConfig,
) -> Result<TokenPair, AppError> {
    let claims = verify_refresh_token(refresh_token, security)?;
    debug!(sub = %claims.sub, provider = %claims.provider, "rotating token pair");

    let identity = Identity {
        id: claims.sub,
        email: claims.email,
        name: claims.name,
    };
    mint_token_pair(&identity, claims.provider, now, security)
}
