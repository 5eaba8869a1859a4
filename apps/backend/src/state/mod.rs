pub mod app_state;
pub mod provider_config;
pub mod security_config;
