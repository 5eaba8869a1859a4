use url::Url;

use crate::auth::identity::Provider;
use crate::error::AppError;

/// OAuth endpoints and credentials for one provider, loaded once at startup
/// and passed by reference; handlers never read the environment.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub client_id: String,
    pub authorize_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl ProviderEndpoints {
    /// Build the full provider-authorize URL the browser is redirected to.
    pub fn authorize_redirect(&self, provider: Provider) -> Result<String, AppError> {
        let mut url = Url::parse(&self.authorize_url)
            .map_err(|e| AppError::config(format!("bad authorize url for {provider}: {e}")))?;

        let response_mode = match provider {
            Provider::Google => None,
            // Apple posts the result back, hence the form_post mode and the
            // POST-shaped callback route.
            Provider::Apple => Some("form_post"),
        };

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &self.scopes.join(" "));
            if let Some(mode) = response_mode {
                query.append_pair("response_mode", mode);
            }
        }

        Ok(url.into())
    }
}

/// Provider configuration for both supported providers, plus the client
/// origin the callback redirects the browser back to.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub google: ProviderEndpoints,
    pub apple: ProviderEndpoints,
    /// Base URL of the browser client, e.g. `https://app.example.com`.
    pub client_origin: String,
}

impl ProviderConfig {
    pub fn endpoints(&self, provider: Provider) -> &ProviderEndpoints {
        match provider {
            Provider::Google => &self.google,
            Provider::Apple => &self.apple,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            google: ProviderEndpoints {
                client_id: require_env("GOOGLE_CLIENT_ID")?,
                authorize_url: std::env::var("GOOGLE_AUTHORIZE_URL").unwrap_or_else(|_| {
                    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
                }),
                redirect_uri: require_env("GOOGLE_CALLBACK_URL")?,
                scopes: vec!["email".to_string(), "profile".to_string()],
            },
            apple: ProviderEndpoints {
                client_id: require_env("APPLE_CLIENT_ID")?,
                authorize_url: std::env::var("APPLE_AUTHORIZE_URL")
                    .unwrap_or_else(|_| "https://appleid.apple.com/auth/authorize".to_string()),
                redirect_uri: require_env("APPLE_CALLBACK_URL")?,
                scopes: vec!["email".to_string(), "name".to_string()],
            },
            client_origin: require_env("CLIENT_ORIGIN")?,
        })
    }

    pub fn for_tests() -> Self {
        Self {
            google: ProviderEndpoints {
                client_id: "google-test-client".to_string(),
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                redirect_uri: "http://localhost:3001/auth/google/callback".to_string(),
                scopes: vec!["email".to_string(), "profile".to_string()],
            },
            apple: ProviderEndpoints {
                client_id: "apple-test-client".to_string(),
                authorize_url: "https://appleid.apple.com/auth/authorize".to_string(),
                redirect_uri: "http://localhost:3001/auth/apple/callback".to_string(),
                scopes: vec!["email".to_string(), "name".to_string()],
            },
            client_origin: "http://localhost:3000".to_string(),
        }
    }
}

fn require_env(var: &str) -> Result<String, AppError> {
    std::env::var(var).map_err(|_| AppError::config(format!("{var} must be set")))
}
