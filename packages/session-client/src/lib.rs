//! Browser-side session handling for the federated-auth backend.
//!
//! The crate models the client half of the stateless-token design: it
//! persists the access/refresh pair, derives the UI-visible user by locally
//! decoding the access token, renews proactively inside a five-minute
//! buffer, and captures OAuth handshake completions over the redirect or
//! popup transport. Browser capabilities (storage, clock, HTTP, window) are
//! injected as traits so every state transition is testable off-browser.

pub mod api;
pub mod clock;
pub mod decode;
pub mod error;
pub mod kv;
pub mod launcher;
pub mod store;
pub mod types;

pub use api::{AuthApi, HttpAuthApi};
pub use clock::{Clock, SystemClock};
pub use decode::decode_claims;
pub use error::{ApiError, DecodeError, LaunchError};
pub use kv::{KeyValueStore, MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
pub use launcher::{
    consume_redirect, login_url, CompletionMessage, PopupLauncher, UrlBar, WindowOpener,
};
pub use store::{SessionState, SessionStore, RENEWAL_BUFFER_SECS};
pub use types::{DecodedClaims, Provider, TokenPair, User};
