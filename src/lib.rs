//! # AuthGate - credential issuance and session validation
//!
//! A small HTTP service that registers users, logs them in, and hands out a
//! short-lived access token plus a longer-lived refresh token. Every protected
//! request must present an access token issued to the exact user ID it
//! addresses.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use authgate::{api::routes::create_router, AppState, AuthGateConfig};
//!
//! let config = AuthGateConfig::load("authgate.toml")?;
//! let state = AppState::from_config(config).await?;
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST handlers, routes and OpenAPI document
//! - [`auth`] - token codec, session tokens, request gate, credential service
//! - [`db`] - user storage (in-memory or file-backed SQLite)
//! - [`types`] - request/response envelopes and error handling
//! - [`utils`] - TOML configuration
//!
//! ## Token flow
//!
//! 1. `POST /login` returns an access token (header and body) and sets the
//!    refresh token cookie.
//! 2. Protected calls send `Authorization: <access token>` and `?id=<user id>`.
//! 3. When the access token expires, `GET /refreshToken` trades the cookie
//!    for a fresh pair.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Tokens, the request gate and credential management.
pub mod auth;
/// User record storage.
pub mod db;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

pub use db::{DatabaseProvider, TursoClient, UserStore};
pub use types::{AppError, Result};
pub use utils::toml_config::AuthGateConfig;

use crate::auth::{
    clock::{Clock, SystemClock},
    credentials::CredentialService,
    jwt::TokenCodec,
    middleware::AuthGate,
    password::{Argon2Hasher, CredentialHasher},
    session::SessionTokenManager,
};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AuthGateConfig>,
    /// Login and account operations
    pub credentials: Arc<CredentialService>,
    /// Token issuance and validation
    pub tokens: Arc<SessionTokenManager>,
    /// Request gate shared with the middleware layer
    pub gate: Arc<AuthGate>,
}

impl AppState {
    /// Wires every component from explicit parts.
    pub fn new(
        config: AuthGateConfig,
        secret: &str,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let codec = TokenCodec::new(secret, clock.clone());
        let tokens = Arc::new(SessionTokenManager::new(
            codec,
            config.auth.access_token_ttl,
            config.auth.refresh_token_ttl,
        ));
        let gate = Arc::new(AuthGate::new(
            tokens.clone(),
            config.auth.ignored_paths.iter().cloned(),
        ));
        let credentials = Arc::new(CredentialService::new(
            store,
            hasher,
            tokens.clone(),
            clock,
        )?);

        Ok(Self {
            config: Arc::new(config),
            credentials,
            tokens,
            gate,
        })
    }

    /// Resolves the signing secret, opens the configured database and uses
    /// the system clock.
    pub async fn from_config(config: AuthGateConfig) -> Result<Self> {
        let secret = config
            .jwt_secret()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let store = DatabaseProvider::from_url(&config.database.url)
            .create_client()
            .await?;

        let password = &config.auth.password;
        let hasher = Argon2Hasher::new(
            password.memory_kib,
            password.iterations,
            password.parallelism,
        )?;

        Self::new(
            config,
            &secret,
            store,
            Arc::new(hasher),
            Arc::new(SystemClock),
        )
    }
}
