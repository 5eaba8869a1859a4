use std::sync::Arc;

use crate::providers::fetcher::ProfileFetcher;

use super::provider_config::ProviderConfig;
use super::security_config::SecurityConfig;

/// Application state containing shared, immutable resources.
///
/// There is deliberately no database handle here: a session's validity is
/// entirely determined by token signature and embedded expiry.
#[derive(Clone)]
pub struct AppState {
    /// Security configuration including JWT signing settings
    pub security: SecurityConfig,
    /// OAuth endpoints for the supported providers
    pub providers: ProviderConfig,
    /// Boundary to the external providers
    pub profile_fetcher: Arc<dyn ProfileFetcher>,
}

impl AppState {
    pub fn new(
        security: SecurityConfig,
        providers: ProviderConfig,
        profile_fetcher: Arc<dyn ProfileFetcher>,
    ) -> Self {
        Self {
            security,
            providers,
            profile_fetcher,
        }
    }

    /// Test state with the given fetcher and default test secrets.
    pub fn for_tests(profile_fetcher: Arc<dyn ProfileFetcher>) -> Self {
        Self::new(
            SecurityConfig::for_tests(),
            ProviderConfig::for_tests(),
            profile_fetcher,
        )
    }

    /// Test state with an explicit security config.
    pub fn for_tests_with_security(
        security: SecurityConfig,
        profile_fetcher: Arc<dyn ProfileFetcher>,
    ) -> Self {
        Self::new(security, ProviderConfig::for_tests(), profile_fetcher)
    }
}
