use serde::{Deserialize, Serialize};

/// Providers the backend exposes authorize routes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Apple,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Apple => "apple",
        }
    }
}

/// Signed access + refresh token pair as delivered by the backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Claims the client reads out of the access token payload. Only the fields
/// the UI and the renewal logic need; everything else is ignored.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DecodedClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
}

/// UI-visible identity, projected from the decoded access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl From<DecodedClaims> for User {
    fn from(claims: DecodedClaims) -> Self {
        User {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}
