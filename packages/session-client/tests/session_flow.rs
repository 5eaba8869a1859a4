//! State-machine tests for the session store.
//!
//! Run with:
//!   cargo test -p session-client --test session_flow

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use session_client::{
    ApiError, AuthApi, Clock, KeyValueStore, MemoryStore, SessionState, SessionStore, TokenPair,
    ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};
use tokio::sync::Semaphore;

/// Token with a decodable payload and a throwaway signature; the client
/// never checks signatures locally.
fn fake_token(sub: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "sub": sub,
            "email": format!("{sub}@example.com"),
            "name": "Ann",
            "provider": "google",
            "iat": exp - 3600,
            "exp": exp
        })
        .to_string(),
    );
    format!("{header}.{payload}.fakesig")
}

struct ManualClock {
    now: Mutex<i64>,
}

impl ManualClock {
    fn at(now: i64) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        *self.now.lock().unwrap()
    }
}

enum RefreshBehavior {
    Succeed(TokenPair),
    Deny,
}

struct StubApi {
    behavior: RefreshBehavior,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    logout_fails: bool,
    /// When set, refresh blocks until a permit is released.
    gate: Option<Arc<Semaphore>>,
}

impl StubApi {
    fn succeeding(pair: TokenPair) -> Self {
        Self {
            behavior: RefreshBehavior::Succeed(pair),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            logout_fails: false,
            gate: None,
        }
    }

    fn denying() -> Self {
        Self {
            behavior: RefreshBehavior::Deny,
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            logout_fails: false,
            gate: None,
        }
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn failing_logout(mut self) -> Self {
        self.logout_fails = true;
        self
    }
}

#[async_trait]
impl AuthApi for StubApi {
    async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        match &self.behavior {
            RefreshBehavior::Succeed(pair) => Ok(pair.clone()),
            RefreshBehavior::Deny => Err(ApiError::Unauthorized),
        }
    }

    async fn logout(&self, _access_token: &str) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_fails {
            Err(ApiError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

const NOW: i64 = 1_700_000_000;

fn store_with(
    kv: Arc<MemoryStore>,
    api: Arc<StubApi>,
    now: i64,
) -> SessionStore {
    SessionStore::new(kv, api, Arc::new(ManualClock::at(now)))
}

fn seed_session(kv: &MemoryStore, access: &str, refresh: &str) {
    kv.set(ACCESS_TOKEN_KEY, access);
    kv.set(REFRESH_TOKEN_KEY, refresh);
}

#[tokio::test]
async fn fresh_token_authenticates_without_network() {
    let kv = Arc::new(MemoryStore::new());
    seed_session(&kv, &fake_token("g1", NOW + 3600), "refresh-1");
    let api = Arc::new(StubApi::denying());
    let store = store_with(kv, api.clone(), NOW);

    assert_eq!(store.initialize().await, SessionState::Authenticated);

    let user = store.user().unwrap();
    assert_eq!(user.id, "g1");
    assert_eq!(user.email, "g1@example.com");
    assert_eq!(user.name.as_deref(), Some("Ann"));
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_tokens_means_unauthenticated() {
    let kv = Arc::new(MemoryStore::new());
    let api = Arc::new(StubApi::denying());
    let store = store_with(kv, api.clone(), NOW);

    assert_eq!(store.initialize().await, SessionState::Unauthenticated);
    assert!(store.user().is_none());
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn token_inside_renewal_buffer_triggers_exactly_one_refresh() {
    let kv = Arc::new(MemoryStore::new());
    // 100 seconds of life left, well inside the 5-minute buffer.
    seed_session(&kv, &fake_token("g1", NOW + 100), "refresh-1");

    let renewed = TokenPair {
        access_token: fake_token("g1", NOW + 3600),
        refresh_token: "refresh-2".to_string(),
    };
    let api = Arc::new(StubApi::succeeding(renewed.clone()));
    let store = store_with(kv.clone(), api.clone(), NOW);

    assert_eq!(store.initialize().await, SessionState::Authenticated);
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(kv.get(ACCESS_TOKEN_KEY).as_deref(), Some(renewed.access_token.as_str()));
    assert_eq!(kv.get(REFRESH_TOKEN_KEY).as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn already_expired_token_triggers_refresh() {
    let kv = Arc::new(MemoryStore::new());
    seed_session(&kv, &fake_token("g1", NOW - 10), "refresh-1");

    let api = Arc::new(StubApi::succeeding(TokenPair {
        access_token: fake_token("g1", NOW + 3600),
        refresh_token: "refresh-2".to_string(),
    }));
    let store = store_with(kv, api.clone(), NOW);

    assert_eq!(store.initialize().await, SessionState::Authenticated);
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_denial_clears_everything() {
    let kv = Arc::new(MemoryStore::new());
    seed_session(&kv, &fake_token("g1", NOW - 10), "refresh-1");
    let api = Arc::new(StubApi::denying());
    let store = store_with(kv.clone(), api.clone(), NOW);

    assert_eq!(store.initialize().await, SessionState::Unauthenticated);
    assert!(store.user().is_none());
    assert!(kv.get(ACCESS_TOKEN_KEY).is_none());
    assert!(kv.get(REFRESH_TOKEN_KEY).is_none());
    // One attempt, no retry loop.
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_yielding_expired_access_token_clears_session() {
    let kv = Arc::new(MemoryStore::new());
    seed_session(&kv, &fake_token("g1", NOW + 100), "refresh-1");

    // Misbehaving (or clock-skewed) server: the renewed access token is
    // already expired. The store must not trust it.
    let api = Arc::new(StubApi::succeeding(TokenPair {
        access_token: fake_token("g1", NOW - 5),
        refresh_token: "refresh-2".to_string(),
    }));
    let store = store_with(kv.clone(), api.clone(), NOW);

    assert_eq!(store.initialize().await, SessionState::Unauthenticated);
    assert!(store.user().is_none());
    assert!(kv.get(ACCESS_TOKEN_KEY).is_none());
    assert!(kv.get(REFRESH_TOKEN_KEY).is_none());
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn undecodable_persisted_token_discards_session_without_network() {
    let kv = Arc::new(MemoryStore::new());
    seed_session(&kv, "garbage-not-a-jwt", "refresh-1");
    let api = Arc::new(StubApi::denying());
    let store = store_with(kv.clone(), api.clone(), NOW);

    assert_eq!(store.initialize().await, SessionState::Unauthenticated);
    assert!(kv.get(ACCESS_TOKEN_KEY).is_none());
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn complete_login_persists_and_authenticates() {
    let kv = Arc::new(MemoryStore::new());
    let api = Arc::new(StubApi::denying());
    let store = store_with(kv.clone(), api, NOW);

    let pair = TokenPair {
        access_token: fake_token("a1", NOW + 3600),
        refresh_token: "refresh-1".to_string(),
    };

    assert_eq!(store.complete_login(pair).await, SessionState::Authenticated);
    assert_eq!(store.user().unwrap().id, "a1");
    assert!(kv.get(ACCESS_TOKEN_KEY).is_some());
    assert!(kv.get(REFRESH_TOKEN_KEY).is_some());
}

#[tokio::test]
async fn logout_notifies_server_and_clears() {
    let kv = Arc::new(MemoryStore::new());
    seed_session(&kv, &fake_token("g1", NOW + 3600), "refresh-1");
    let api = Arc::new(StubApi::denying());
    let store = store_with(kv.clone(), api.clone(), NOW);
    store.initialize().await;

    store.logout().await;

    assert_eq!(store.state(), SessionState::Unauthenticated);
    assert!(store.user().is_none());
    assert!(kv.get(ACCESS_TOKEN_KEY).is_none());
    assert!(kv.get(REFRESH_TOKEN_KEY).is_none());
    assert_eq!(api.logout_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_succeeds_locally_even_when_notify_fails() {
    let kv = Arc::new(MemoryStore::new());
    seed_session(&kv, &fake_token("g1", NOW + 3600), "refresh-1");
    let api = Arc::new(StubApi::denying().failing_logout());
    let store = store_with(kv.clone(), api, NOW);
    store.initialize().await;

    store.logout().await;

    assert_eq!(store.state(), SessionState::Unauthenticated);
    assert!(kv.get(ACCESS_TOKEN_KEY).is_none());
}

#[tokio::test]
async fn logout_wins_over_in_flight_refresh() {
    let kv = Arc::new(MemoryStore::new());
    seed_session(&kv, &fake_token("g1", NOW - 10), "refresh-1");

    let gate = Arc::new(Semaphore::new(0));
    let api = Arc::new(
        StubApi::succeeding(TokenPair {
            access_token: fake_token("g1", NOW + 3600),
            refresh_token: "refresh-2".to_string(),
        })
        .gated(gate.clone()),
    );
    let store = Arc::new(store_with(kv.clone(), api.clone(), NOW));

    // Refresh departs and parks on the gate.
    let refreshing = tokio::spawn({
        let store = store.clone();
        async move { store.refresh().await }
    });
    while api.refresh_calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    // User logs out while the refresh is in flight, then the refresh
    // response arrives.
    store.logout().await;
    gate.add_permits(1);
    refreshing.await.unwrap();

    // Logout is the last writer: nothing resurrected.
    assert_eq!(store.state(), SessionState::Unauthenticated);
    assert!(store.user().is_none());
    assert!(kv.get(ACCESS_TOKEN_KEY).is_none());
    assert!(kv.get(REFRESH_TOKEN_KEY).is_none());
}

#[tokio::test]
async fn concurrent_refresh_triggers_collapse_to_one_call() {
    let kv = Arc::new(MemoryStore::new());
    seed_session(&kv, &fake_token("g1", NOW - 10), "refresh-1");

    let gate = Arc::new(Semaphore::new(0));
    let api = Arc::new(
        StubApi::succeeding(TokenPair {
            access_token: fake_token("g1", NOW + 3600),
            refresh_token: "refresh-2".to_string(),
        })
        .gated(gate.clone()),
    );
    let store = Arc::new(store_with(kv, api.clone(), NOW));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.refresh().await }
    });
    while api.refresh_calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    // Second trigger while the first is still in flight is a no-op.
    assert_eq!(store.refresh().await, SessionState::Refreshing);

    gate.add_permits(1);
    assert_eq!(first.await.unwrap(), SessionState::Authenticated);
    assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
}
