//! Auth API transport.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::ApiError;
use crate::types::TokenPair;

/// The two calls the session store makes against the backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
    /// Best-effort logout notification. Callers ignore the result.
    async fn logout(&self, access_token: &str) -> Result<(), ApiError>;
}

/// Reqwest-backed transport against a deployed backend.
pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let response = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(ApiError::Protocol(format!(
                "refresh returned {}",
                response.status()
            )));
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|e| ApiError::Protocol(e.to_string()))
    }

    async fn logout(&self, access_token: &str) -> Result<(), ApiError> {
        debug!("notifying server of logout");
        self.http
            .post(format!("{}/auth/logout", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(())
    }
}
