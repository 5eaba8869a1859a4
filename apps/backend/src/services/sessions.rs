//! Session orchestration: login, refresh, logout.
//!
//! Thin composition over the normalizer and the token module. Holds no
//! durable state; every call is a pure function of its inputs plus the
//! signing configuration.

use std::time::SystemTime;

use serde_json::Value;
use tracing::info;

use crate::auth::identity::{normalize, Provider};
use crate::auth::jwt::{mint_token_pair, rotate, TokenPair};
use crate::error::AppError;
use crate::state::security_config::SecurityConfig;

/// Normalize a freshly-verified provider profile and mint a token pair.
pub fn login(
    provider: Provider,
    profile: &Value,
    now: SystemTime,
    security: &SecurityConfig,
) -> Result<TokenPair, AppError> {
    let identity = normalize(provider, profile)?;
    info!(provider = %provider, sub = %identity.id, "issuing session tokens");
    mint_token_pair(&identity, provider, now, security)
}

/// Exchange a valid refresh token for a new pair. Any verification failure
/// surfaces as `Unauthorized`; no pair is ever partially constructed.
pub fn refresh(
    refresh_token: &str,
    now: SystemTime,
    security: &SecurityConfig,
) -> Result<TokenPair, AppError> {
    rotate(refresh_token, now, security)
}

/// Acknowledge a logout. The design is stateless: there is no server-side
/// session record to destroy and issued tokens remain valid until expiry.
/// The call exists so clients have something to notify best-effort.
pub fn logout(sub: &str) {
    info!(sub = %sub, "logout acknowledged (stateless, no revocation)");
}
