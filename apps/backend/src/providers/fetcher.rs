//! Opaque boundary to the OAuth providers.
//!
//! The redirect handshake itself is not this service's concern: by the time
//! a callback request arrives, some external system has authenticated the
//! user and the only remaining step is turning the callback parameters into
//! a verified profile payload. That step lives behind [`ProfileFetcher`] so
//! route tests can inject a stub instead of a live provider.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::auth::identity::Provider;
use crate::error::AppError;
use crate::state::provider_config::ProviderConfig;

/// Exchanges provider callback parameters for a verified profile payload.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch(
        &self,
        provider: Provider,
        params: &HashMap<String, String>,
    ) -> Result<Value, AppError>;
}

/// Production fetcher: trades the authorization code for provider tokens and
/// reads the profile from the provider's userinfo endpoint over HTTPS.
pub struct HttpProfileFetcher {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl HttpProfileFetcher {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn userinfo_url(provider: Provider) -> &'static str {
        match provider {
            Provider::Google => "https://www.googleapis.com/oauth2/v2/userinfo",
            Provider::Apple => "https://appleid.apple.com/auth/userinfo",
        }
    }

    fn token_url(provider: Provider) -> &'static str {
        match provider {
            Provider::Google => "https://oauth2.googleapis.com/token",
            Provider::Apple => "https://appleid.apple.com/auth/token",
        }
    }
}

#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn fetch(
        &self,
        provider: Provider,
        params: &HashMap<String, String>,
    ) -> Result<Value, AppError> {
        let code = params
            .get("code")
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                AppError::bad_request("MISSING_CODE", "callback carried no authorization code".to_string())
            })?;

        let endpoints = self.config.endpoints(provider);

        let token_response: Value = self
            .http
            .post(Self::token_url(provider))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("client_id", endpoints.client_id.as_str()),
                ("redirect_uri", endpoints.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("{provider} token exchange failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::upstream(format!("{provider} token exchange rejected: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("{provider} token response unreadable: {e}")))?;

        let provider_access_token = token_response
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                warn!(provider = %provider, "token exchange succeeded without access_token");
                AppError::upstream(format!("{provider} returned no access token"))
            })?;

        self.http
            .get(Self::userinfo_url(provider))
            .bearer_auth(provider_access_token)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("{provider} userinfo fetch failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::upstream(format!("{provider} userinfo rejected: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("{provider} profile unreadable: {e}")))
    }
}
