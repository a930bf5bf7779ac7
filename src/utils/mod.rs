/// TOML server configuration.
pub mod toml_config;

pub use toml_config::{AuthGateConfig, ConfigError};
