#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod auth;
pub mod error;
pub mod extractors;
pub mod health;
pub mod middleware;
pub mod providers;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod trace_ctx;

// Re-exports for public API
pub use auth::identity::{normalize, Identity, Provider};
pub use auth::jwt::{
    mint_token_pair, rotate, verify_access_token, verify_refresh_token, TokenClaims, TokenPair,
};
pub use error::AppError;
pub use extractors::auth_token::AuthToken;
pub use extractors::current_user::CurrentUser;
pub use middleware::cors::cors_middleware;
pub use middleware::request_trace::RequestTrace;
pub use middleware::structured_logger::StructuredLogger;
pub use providers::fetcher::{HttpProfileFetcher, ProfileFetcher};
pub use state::app_state::AppState;
pub use state::provider_config::{ProviderConfig, ProviderEndpoints};
pub use state::security_config::SecurityConfig;
