//! Token Engine and Credential Management
//!
//! This module holds everything that decides who a caller is: signing and
//! verifying tokens, issuing subject-bound access/refresh pairs, the request
//! gate, and the login/account service built on top of them.
//!
//! # Module Structure
//!
//! - [`auth::jwt`](crate::auth::jwt) - HS256 token codec and `TokenError`
//! - [`auth::session`](crate::auth::session) - access/refresh issuance, validation, rotation
//! - [`auth::middleware`](crate::auth::middleware) - the `AuthGate` axum layer
//! - [`auth::credentials`](crate::auth::credentials) - login, signup, update, delete
//! - [`auth::password`](crate::auth::password) - Argon2id password hashing
//! - [`auth::clock`](crate::auth::clock) - wall clock and a manual clock for tests
//!
//! # Security Properties
//!
//! - **Subject binding**: an access token is only accepted for the user ID it
//!   was issued to, so a valid token cannot be replayed against another account.
//! - **Uniform failures**: expired, forged, malformed and mis-bound tokens all
//!   produce the same `401 Invalid token`; unknown usernames and wrong
//!   passwords produce the same login error.
//! - **Stateless**: nothing is stored per token. Logout clears client state
//!   only, and a rotated-out refresh token stays usable until it expires.
//!
//! # Usage
//!
//! ```ignore
//! use authgate::auth::{clock::SystemClock, jwt::TokenCodec, session::SessionTokenManager};
//!
//! let codec = TokenCodec::new(&secret, Arc::new(SystemClock));
//! let tokens = SessionTokenManager::new(codec, 300, 86_400);
//! let pair = tokens.issue_pair(&user.id)?;
//! assert!(tokens.validate_access_token(&user.id, &pair.access_token));
//! ```

/// Time sources.
pub mod clock;
/// Login and account management.
pub mod credentials;
/// Token signing and verification.
pub mod jwt;
/// Request gate middleware.
pub mod middleware;
/// Password hashing.
pub mod password;
/// Subject-bound token issuance and rotation.
pub mod session;
