//! User record storage.
//!
//! - [`traits`] - the `UserStore` abstraction and provider selection
//! - [`turso`] - libsql implementation (in-memory or local SQLite file)

pub mod traits;
pub mod turso;

pub use traits::{DatabaseProvider, UserStore};
pub use turso::TursoClient;
