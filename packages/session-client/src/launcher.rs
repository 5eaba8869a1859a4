//! OAuth handshake launch and completion capture.
//!
//! Two delivery transports; a deployment picks one:
//! - redirect: full-page navigation out, tokens come back embedded in the
//!   query string and must be stripped from the visible URL after one
//!   consumption;
//! - popup: a sized window, completion arrives as a cross-window message
//!   whose origin must match the API origin before the payload is trusted.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::LaunchError;
use crate::types::{Provider, TokenPair};

/// Build the backend authorize URL a login button navigates to.
pub fn login_url(api_origin: &str, provider: Provider) -> String {
    format!(
        "{}/auth/{}/authorize",
        api_origin.trim_end_matches('/'),
        provider.as_str()
    )
}

/// The visible browser URL bar, abstracted for tests.
pub trait UrlBar {
    /// Current query string, without the leading `?`.
    fn query(&self) -> String;
    /// Replace the query string without adding a history entry.
    fn replace_query(&self, query: &str);
}

/// Consume a redirect-delivered token pair from the query string.
///
/// Returns the pair and strips both token parameters from the visible URL;
/// other parameters survive. Idempotent: a second call (re-render) finds
/// nothing and returns `None`.
pub fn consume_redirect(url_bar: &dyn UrlBar) -> Option<TokenPair> {
    let query = url_bar.query();

    let mut access_token = None;
    let mut refresh_token = None;
    let mut remainder = url::form_urlencoded::Serializer::new(String::new());

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "accessToken" => access_token = Some(value.into_owned()),
            "refreshToken" => refresh_token = Some(value.into_owned()),
            _ => {
                remainder.append_pair(&key, &value);
            }
        }
    }

    let pair = TokenPair {
        access_token: access_token?,
        refresh_token: refresh_token?,
    };

    url_bar.replace_query(&remainder.finish());
    Some(pair)
}

/// A cross-window message as observed by the host page.
#[derive(Debug, Clone)]
pub struct CompletionMessage {
    /// Origin of the sending window, as reported by the browser.
    pub origin: String,
    pub pair: TokenPair,
}

/// Opens the actual popup window; browser-backed in production.
pub trait WindowOpener {
    fn open(&self, url: &str, width: u32, height: u32) -> Result<(), LaunchError>;
}

pub struct PopupLauncher {
    api_origin: String,
    width: u32,
    height: u32,
}

impl PopupLauncher {
    pub fn new(api_origin: impl Into<String>) -> Self {
        Self {
            api_origin: api_origin.into().trim_end_matches('/').to_string(),
            width: 500,
            height: 640,
        }
    }

    /// Open the handshake popup and await the completion message.
    ///
    /// The receiver is consumed: the subscription is used exactly once and
    /// dropped on return or cancellation. Messages from any origin other
    /// than the API origin are ignored, not treated as completion.
    pub async fn launch(
        &self,
        provider: Provider,
        opener: &dyn WindowOpener,
        mut messages: mpsc::Receiver<CompletionMessage>,
    ) -> Result<TokenPair, LaunchError> {
        let url = login_url(&self.api_origin, provider);
        opener.open(&url, self.width, self.height)?;
        debug!(provider = provider.as_str(), "popup opened, awaiting completion");

        while let Some(message) = messages.recv().await {
            if message.origin != self.api_origin {
                warn!(origin = %message.origin, "ignoring completion message from unexpected origin");
                continue;
            }
            return Ok(message.pair);
        }

        // Channel closed without a trusted message: popup closed or the
        // subscription was torn down.
        Err(LaunchError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::sync::mpsc;

    use super::{consume_redirect, login_url, CompletionMessage, PopupLauncher, UrlBar, WindowOpener};
    use crate::error::LaunchError;
    use crate::types::{Provider, TokenPair};

    struct FakeUrlBar {
        query: Mutex<String>,
    }

    impl FakeUrlBar {
        fn new(query: &str) -> Self {
            Self {
                query: Mutex::new(query.to_string()),
            }
        }
    }

    impl UrlBar for FakeUrlBar {
        fn query(&self) -> String {
            self.query.lock().unwrap().clone()
        }

        fn replace_query(&self, query: &str) {
            *self.query.lock().unwrap() = query.to_string();
        }
    }

    struct OpenOk;
    struct OpenBlocked;

    impl WindowOpener for OpenOk {
        fn open(&self, _url: &str, _w: u32, _h: u32) -> Result<(), LaunchError> {
            Ok(())
        }
    }

    impl WindowOpener for OpenBlocked {
        fn open(&self, _url: &str, _w: u32, _h: u32) -> Result<(), LaunchError> {
            Err(LaunchError::PopupBlocked)
        }
    }

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "T1".to_string(),
            refresh_token: "T2".to_string(),
        }
    }

    #[test]
    fn login_url_targets_provider_authorize_route() {
        assert_eq!(
            login_url("https://api.example.com/", Provider::Google),
            "https://api.example.com/auth/google/authorize"
        );
        assert_eq!(
            login_url("https://api.example.com", Provider::Apple),
            "https://api.example.com/auth/apple/authorize"
        );
    }

    #[test]
    fn redirect_consumption_extracts_and_strips_tokens() {
        let bar = FakeUrlBar::new("accessToken=T1&refreshToken=T2&tab=settings");

        let consumed = consume_redirect(&bar).unwrap();
        assert_eq!(consumed, pair());
        // Unrelated parameters survive the strip.
        assert_eq!(bar.query(), "tab=settings");
    }

    #[test]
    fn redirect_consumption_is_idempotent() {
        let bar = FakeUrlBar::new("accessToken=T1&refreshToken=T2");

        assert!(consume_redirect(&bar).is_some());
        assert!(consume_redirect(&bar).is_none());
        assert_eq!(bar.query(), "");
    }

    #[test]
    fn redirect_consumption_requires_both_tokens() {
        let bar = FakeUrlBar::new("accessToken=T1");
        assert!(consume_redirect(&bar).is_none());
        // Nothing consumed, nothing stripped.
        assert_eq!(bar.query(), "accessToken=T1");
    }

    #[tokio::test]
    async fn popup_blocked_surfaces_error() {
        let launcher = PopupLauncher::new("https://api.example.com");
        let (_tx, rx) = mpsc::channel(4);

        let result = launcher.launch(Provider::Google, &OpenBlocked, rx).await;
        assert_eq!(result.unwrap_err(), LaunchError::PopupBlocked);
    }

    #[tokio::test]
    async fn popup_completion_from_api_origin_is_trusted() {
        let launcher = PopupLauncher::new("https://api.example.com");
        let (tx, rx) = mpsc::channel(4);

        tx.send(CompletionMessage {
            origin: "https://api.example.com".to_string(),
            pair: pair(),
        })
        .await
        .unwrap();

        let result = launcher.launch(Provider::Google, &OpenOk, rx).await.unwrap();
        assert_eq!(result, pair());
    }

    #[tokio::test]
    async fn popup_message_from_wrong_origin_is_ignored() {
        let launcher = PopupLauncher::new("https://api.example.com");
        let (tx, rx) = mpsc::channel(4);

        tx.send(CompletionMessage {
            origin: "https://evil.example.com".to_string(),
            pair: TokenPair {
                access_token: "forged".to_string(),
                refresh_token: "forged".to_string(),
            },
        })
        .await
        .unwrap();
        tx.send(CompletionMessage {
            origin: "https://api.example.com".to_string(),
            pair: pair(),
        })
        .await
        .unwrap();

        let result = launcher.launch(Provider::Google, &OpenOk, rx).await.unwrap();
        assert_eq!(result, pair());
    }

    #[tokio::test]
    async fn popup_closed_without_message_is_cancelled() {
        let launcher = PopupLauncher::new("https://api.example.com");
        let (tx, rx) = mpsc::channel::<CompletionMessage>(4);
        drop(tx);

        let result = launcher.launch(Provider::Google, &OpenOk, rx).await;
        assert_eq!(result.unwrap_err(), LaunchError::Cancelled);
    }
}
