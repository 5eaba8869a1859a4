//! Browser-session state machine.
//!
//! Holds the persisted token pair, projects the UI-visible user from the
//! decoded access token, and drives proactive renewal. Decisions are made
//! purely from token contents and the injected clock; the only network
//! traffic is the refresh call and the best-effort logout notify.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::api::AuthApi;
use crate::clock::Clock;
use crate::decode::decode_claims;
use crate::kv::{KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::types::{TokenPair, User};

/// Refresh this many seconds before the access token actually expires.
pub const RENEWAL_BUFFER_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Refreshing,
    /// Decode or refresh failed; transient, always collapses to
    /// `Unauthenticated` with all persisted tokens cleared.
    Invalid,
}

struct Inner {
    state: SessionState,
    user: Option<User>,
    /// Bumped on logout; an in-flight refresh whose captured epoch no
    /// longer matches must discard its result (logout is the last writer).
    epoch: u64,
}

pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    api: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, api: Arc<dyn AuthApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            api,
            clock,
            inner: Mutex::new(Inner {
                state: SessionState::Unauthenticated,
                user: None,
                epoch: 0,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// UI-visible identity, projected from the last validated access token.
    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.kv.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.kv.get(REFRESH_TOKEN_KEY)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("session lock poisoned")
    }

    /// Clear persisted tokens and the projected user. Always lands in
    /// `Unauthenticated`.
    fn clear_local(&self) {
        self.kv.remove(ACCESS_TOKEN_KEY);
        self.kv.remove(REFRESH_TOKEN_KEY);
        let mut inner = self.lock();
        inner.user = None;
        inner.state = SessionState::Unauthenticated;
    }

    /// Evaluate the persisted access token and settle into a state.
    ///
    /// Called on app load and after an out-of-band login. A token with more
    /// than the renewal buffer of life left authenticates locally with no
    /// network call; a stale or near-stale token triggers exactly one
    /// refresh; an undecodable token invalidates the whole session.
    pub async fn initialize(&self) -> SessionState {
        let Some(access_token) = self.kv.get(ACCESS_TOKEN_KEY) else {
            self.lock().state = SessionState::Unauthenticated;
            return SessionState::Unauthenticated;
        };

        let claims = match decode_claims(&access_token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "persisted access token undecodable, discarding session");
                self.lock().state = SessionState::Invalid;
                self.clear_local();
                return SessionState::Unauthenticated;
            }
        };

        let now = self.clock.now_unix();
        if claims.exp - RENEWAL_BUFFER_SECS <= now {
            {
                let mut inner = self.lock();
                if inner.state == SessionState::Refreshing {
                    return SessionState::Refreshing;
                }
                inner.state = SessionState::Refreshing;
            }
            return self.do_refresh().await;
        }

        let mut inner = self.lock();
        inner.user = Some(User::from(claims));
        inner.state = SessionState::Authenticated;
        SessionState::Authenticated
    }

    /// Persist a token pair delivered by an OAuth handshake and settle.
    ///
    /// Settling reuses the app-load evaluation rather than jumping straight
    /// to `Authenticated`: the user is only projected after the local
    /// decode-and-expiry check, and a pair that arrives already inside the
    /// renewal buffer triggers an immediate refresh instead of landing
    /// authenticated on a near-dead token.
    pub async fn complete_login(&self, pair: TokenPair) -> SessionState {
        self.kv.set(ACCESS_TOKEN_KEY, &pair.access_token);
        self.kv.set(REFRESH_TOKEN_KEY, &pair.refresh_token);
        self.initialize().await
    }

    /// Trade the persisted refresh token for a new pair. Single-flight: a
    /// call while a refresh is already in flight is a no-op.
    pub async fn refresh(&self) -> SessionState {
        {
            let mut inner = self.lock();
            if inner.state == SessionState::Refreshing {
                return SessionState::Refreshing;
            }
            inner.state = SessionState::Refreshing;
        }
        self.do_refresh().await
    }

    async fn do_refresh(&self) -> SessionState {
        let epoch = self.lock().epoch;

        let Some(refresh_token) = self.kv.get(REFRESH_TOKEN_KEY) else {
            self.clear_local();
            return SessionState::Unauthenticated;
        };

        let result = self.api.refresh(&refresh_token).await;

        // Epoch check and state write happen under one lock so a concurrent
        // logout is strictly ordered before or after this whole block.
        {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                debug!("discarding refresh result, session epoch advanced during flight");
                return inner.state;
            }

            if let Ok(pair) = &result {
                // Same trust rule as on load: claims are only used after a
                // local decode-and-expiry check, even when the server just
                // handed us the token.
                match decode_claims(&pair.access_token) {
                    Ok(claims) if claims.exp > self.clock.now_unix() => {
                        self.kv.set(ACCESS_TOKEN_KEY, &pair.access_token);
                        self.kv.set(REFRESH_TOKEN_KEY, &pair.refresh_token);
                        inner.user = Some(User::from(claims));
                        inner.state = SessionState::Authenticated;
                        return SessionState::Authenticated;
                    }
                    Ok(_) => {
                        warn!("refreshed access token already expired, clearing session");
                        inner.state = SessionState::Invalid;
                    }
                    Err(e) => {
                        warn!(error = %e, "refreshed access token undecodable, clearing session");
                        inner.state = SessionState::Invalid;
                    }
                }
            }
        }

        if let Err(e) = &result {
            // Any failure, 401 included, fully logs the client out; no
            // retry loop.
            warn!(error = %e, "refresh failed, clearing session");
        }
        self.clear_local();
        SessionState::Unauthenticated
    }

    /// Best-effort server notify, then unconditionally clear local state.
    /// From the client's point of view logout always succeeds.
    pub async fn logout(&self) {
        let access_token = self.kv.get(ACCESS_TOKEN_KEY);

        // Advance the epoch first so a refresh resolving mid-logout cannot
        // resurrect the tokens we are about to clear.
        self.lock().epoch += 1;

        if let Some(token) = access_token {
            if let Err(e) = self.api.logout(&token).await {
                debug!(error = %e, "logout notify failed, clearing locally anyway");
            }
        }

        self.clear_local();
    }
}
