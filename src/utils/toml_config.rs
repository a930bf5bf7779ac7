//! TOML-based configuration for authgate
//!
//! The server reads a single file (`authgate.toml` by default). Every field
//! has a default, so an empty file is a valid configuration as long as the
//! signing secret is present in the environment.
//!
//! The configuration is loaded once at startup and never mutated; components
//! receive the values they need when they are constructed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::auth::session::MAX_TOKEN_TTL;

/// Secrets shorter than this are accepted but logged as weak.
pub const RECOMMENDED_SECRET_LEN: usize = 32;

/// Root configuration structure loaded from authgate.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthGateConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Default tracing filter; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable name containing the JWT secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl: i64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl: i64,

    /// Paths that skip token checks. A trailing `*` matches by prefix.
    #[serde(default = "default_ignored_paths")]
    pub ignored_paths: Vec<String>,

    #[serde(default)]
    pub cookie: CookieConfig,

    #[serde(default)]
    pub password: PasswordConfig,
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET".to_string()
}

fn default_access_token_ttl() -> i64 {
    crate::auth::session::DEFAULT_ACCESS_TTL
}

fn default_refresh_token_ttl() -> i64 {
    crate::auth::session::DEFAULT_REFRESH_TTL
}

fn default_ignored_paths() -> Vec<String> {
    [
        "/login",
        "/save",
        "/refreshToken",
        "/health",
        "/api-docs/openapi.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            access_token_ttl: default_access_token_ttl(),
            refresh_token_ttl: default_refresh_token_ttl(),
            ignored_paths: default_ignored_paths(),
            cookie: CookieConfig::default(),
            password: PasswordConfig::default(),
        }
    }
}

/// Attributes of the refresh token cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,

    /// Path scope; the browser only sends the cookie to this path
    #[serde(default = "default_cookie_path")]
    pub path: String,

    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_name() -> String {
    "refreshToken".to_string()
}

fn default_cookie_path() -> String {
    "/refreshToken".to_string()
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            path: default_cookie_path(),
            secure: false,
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordConfig {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,

    #[serde(default = "default_iterations")]
    pub iterations: u32,

    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    argon2::Params::DEFAULT_M_COST
}

fn default_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}

fn default_parallelism() -> u32 {
    argon2::Params::DEFAULT_P_COST
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "./data/authgate.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl AuthGateConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AuthGateConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate internal consistency and secret availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.auth;

        if auth.access_token_ttl <= 0 || auth.refresh_token_ttl <= 0 {
            return Err(ConfigError::ValidationError(
                "token TTLs must be positive".to_string(),
            ));
        }

        if auth.refresh_token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::ValidationError(format!(
                "refresh_token_ttl ({}) exceeds the maximum of {} seconds",
                auth.refresh_token_ttl, MAX_TOKEN_TTL
            )));
        }

        if auth.access_token_ttl >= auth.refresh_token_ttl {
            return Err(ConfigError::ValidationError(format!(
                "access_token_ttl ({}) must be shorter than refresh_token_ttl ({})",
                auth.access_token_ttl, auth.refresh_token_ttl
            )));
        }

        if auth.cookie.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.cookie.name must not be empty".to_string(),
            ));
        }

        if !auth.cookie.path.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "auth.cookie.path must start with '/': {}",
                auth.cookie.path
            )));
        }

        let secret = self.jwt_secret()?;
        if secret.len() < RECOMMENDED_SECRET_LEN {
            warn!(
                env = %auth.jwt_secret_env,
                "JWT secret is shorter than {} bytes",
                RECOMMENDED_SECRET_LEN
            );
        }

        Ok(())
    }

    /// Resolve the signing secret from the configured environment variable.
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        std::env::var(&self.auth.jwt_secret_env)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.jwt_secret_env.clone()))
    }
}
