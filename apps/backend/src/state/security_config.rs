use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::error::AppError;

/// Default access-token lifetime: one hour.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(60 * 60);
/// Default refresh-token lifetime: seven days.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Signing configuration for both token types.
///
/// Access and refresh tokens are signed under distinct secrets so that a
/// leaked access-token secret cannot be used to forge refresh tokens.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// JWT algorithm to use (defaults to HS256)
    pub algorithm: Algorithm,
}

impl SecurityConfig {
    pub fn new(access_secret: impl Into<Vec<u8>>, refresh_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            algorithm: Algorithm::HS256,
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    /// Build from the process environment. `JWT_ACCESS_SECRET` and
    /// `JWT_REFRESH_SECRET` are required; TTL overrides are optional and
    /// given in whole seconds.
    pub fn from_env() -> Result<Self, AppError> {
        let access_secret = std::env::var("JWT_ACCESS_SECRET")
            .map_err(|_| AppError::config("JWT_ACCESS_SECRET must be set"))?;
        let refresh_secret = std::env::var("JWT_REFRESH_SECRET")
            .map_err(|_| AppError::config("JWT_REFRESH_SECRET must be set"))?;

        let access_ttl = env_ttl("JWT_ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL)?;
        let refresh_ttl = env_ttl("JWT_REFRESH_TTL_SECS", DEFAULT_REFRESH_TTL)?;

        Ok(Self::new(access_secret, refresh_secret).with_ttls(access_ttl, refresh_ttl))
    }

    pub fn for_tests() -> Self {
        Self::new(
            "test_access_secret_for_testing_purposes_only",
            "test_refresh_secret_for_testing_purposes_only",
        )
    }
}

fn env_ttl(var: &str, default: Duration) -> Result<Duration, AppError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AppError::config(format!("{var} must be a whole number of seconds"))),
        Err(_) => Ok(default),
    }
}
