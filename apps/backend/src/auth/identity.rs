//! Canonical identity derived from heterogeneous provider profiles.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Supported federated-identity providers. Closed set; adding a provider
/// means adding a normalization arm below and a route pair in `routes::auth`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
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

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical user identity. Produced once per login by [`normalize`];
/// immutable and never persisted server-side.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Map a provider-specific profile payload into an [`Identity`].
///
/// Google-shaped profiles carry `{id, emails: [{value}], displayName}`;
/// Apple-shaped profiles carry `{id, email, name}` where `name` may be a
/// plain string or a `{firstName, lastName}` object. A missing `name` is
/// fine; a missing `id` or unusable email is a `MalformedProfile` error.
pub fn normalize(provider: Provider, profile: &Value) -> Result<Identity, AppError> {
    let id = nonempty_str(profile.get("id"))
        .ok_or_else(|| AppError::malformed_profile(format!("{provider} profile has no id")))?
        .to_string();

    match provider {
        Provider::Google => {
            let email = profile
                .get("emails")
                .and_then(Value::as_array)
                .and_then(|emails| emails.first())
                .and_then(|entry| nonempty_str(entry.get("value")))
                .ok_or_else(|| {
                    AppError::malformed_profile("google profile has no usable email")
                })?
                .to_string();

            let name = nonempty_str(profile.get("displayName")).map(str::to_string);

            Ok(Identity { id, email, name })
        }
        Provider::Apple => {
            let email = nonempty_str(profile.get("email"))
                .ok_or_else(|| AppError::malformed_profile("apple profile has no usable email"))?
                .to_string();

            let name = match profile.get("name") {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                // Apple delivers the name split on first login only.
                Some(Value::Object(parts)) => {
                    let first = nonempty_str(parts.get("firstName"));
                    let last = nonempty_str(parts.get("lastName"));
                    match (first, last) {
                        (Some(first), Some(last)) => Some(format!("{first} {last}")),
                        _ => None,
                    }
                }
                _ => None,
            };

            Ok(Identity { id, email, name })
        }
    }
}

fn nonempty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
