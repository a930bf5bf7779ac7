//! Database abstraction traits
//!
//! This module provides the `UserStore` trait that abstracts over the user
//! record backend (in-memory SQLite, file-based SQLite).
//!
//! # Example
//!
//! ```rust,ignore
//! use authgate::db::DatabaseProvider;
//!
//! // Use in-memory database (default for development/testing)
//! let db = DatabaseProvider::Memory.create_client().await?;
//!
//! // Use file-based SQLite
//! let db = DatabaseProvider::SQLite { path: "data.db".into() }.create_client().await?;
//! ```

use crate::types::{Result, UserRecord};
use async_trait::async_trait;
use std::sync::Arc;

/// Database provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
}

impl DatabaseProvider {
    /// Maps a configured database URL onto a provider. `:memory:` and the
    /// empty string select the in-memory backend.
    pub fn from_url(url: &str) -> Self {
        if url.is_empty() || url == ":memory:" {
            DatabaseProvider::Memory
        } else {
            DatabaseProvider::SQLite {
                path: url.to_string(),
            }
        }
    }

    /// Create a user store from this provider configuration
    pub async fn create_client(&self) -> Result<Arc<dyn UserStore>> {
        match self {
            DatabaseProvider::Memory => {
                let client = super::turso::TursoClient::new_memory().await?;
                Ok(Arc::new(client))
            }
            DatabaseProvider::SQLite { path } => {
                let client = super::turso::TursoClient::new_local(path).await?;
                Ok(Arc::new(client))
            }
        }
    }
}

/// Keyed user record storage.
///
/// Single operations are atomic; nothing spans more than one call. "Not
/// found" is reported as `Ok(None)` / `Ok(false)` and never as an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user record
    async fn insert_user(&self, user: &UserRecord) -> Result<()>;

    /// Get a user by ID
    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>>;

    /// Get a user by username
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Overwrite the record with the same ID. Returns `false` if no such record exists.
    async fn update_user(&self, user: &UserRecord) -> Result<bool>;

    /// Hard-delete a record. Returns `false` if no such record exists.
    async fn delete_user(&self, id: &str) -> Result<bool>;
}
