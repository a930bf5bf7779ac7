use crate::db::traits::UserStore;
use crate::types::{AppError, Result, Role, UserRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database, Row};
use std::collections::BTreeSet;
use std::path::Path;

/// libsql-backed user store.
///
/// A single connection is held for the lifetime of the client; with an
/// in-memory database every new connection would otherwise see an empty
/// schema.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
}

impl TursoClient {
    /// Opens an ephemeral in-memory database.
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open in-memory database: {}", e)))?;

        Self::from_database(db).await
    }

    /// Opens (or creates) a SQLite file at `path`.
    pub async fn new_local(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::Database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database {}: {}", path, e)))?;

        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self { _db: db, conn };
        client.initialize_schema().await?;

        Ok(client)
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    username TEXT UNIQUE NOT NULL,
                    password_hash TEXT NOT NULL,
                    roles TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create users table: {}", e)))?;

        Ok(())
    }

    async fn query_one(&self, sql: &str, key: &str) -> Result<Option<UserRecord>> {
        let mut rows = self
            .conn
            .query(sql, [key])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }
}

fn encode_roles(roles: &BTreeSet<Role>) -> Result<String> {
    serde_json::to_string(roles)
        .map_err(|e| AppError::Database(format!("Failed to encode roles: {}", e)))
}

fn decode_timestamp(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::Database(format!("Invalid timestamp: {}", millis)))
}

fn row_to_user(row: &Row) -> Result<UserRecord> {
    let roles: String = row.get(3).map_err(|e| AppError::Database(e.to_string()))?;
    let roles: BTreeSet<Role> = serde_json::from_str(&roles)
        .map_err(|e| AppError::Database(format!("Corrupt roles column: {}", e)))?;

    Ok(UserRecord {
        id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
        username: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
        password_hash: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
        roles,
        created_at: decode_timestamp(row.get(4).map_err(|e| AppError::Database(e.to_string()))?)?,
        updated_at: decode_timestamp(row.get(5).map_err(|e| AppError::Database(e.to_string()))?)?,
    })
}

fn map_write_error(action: &str, e: libsql::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed: users.username") {
        AppError::Validation(vec!["username: already taken".to_string()])
    } else {
        AppError::Database(format!("Failed to {}: {}", action, msg))
    }
}

#[async_trait]
impl UserStore for TursoClient {
    async fn insert_user(&self, user: &UserRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, username, password_hash, roles, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    user.id.as_str(),
                    user.username.as_str(),
                    user.password_hash.as_str(),
                    encode_roles(&user.roles)?,
                    user.created_at.timestamp_millis(),
                    user.updated_at.timestamp_millis(),
                ),
            )
            .await
            .map_err(|e| map_write_error("create user", e))?;

        Ok(())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        self.query_one(
            "SELECT id, username, password_hash, roles, created_at, updated_at
             FROM users WHERE id = ?",
            id,
        )
        .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        self.query_one(
            "SELECT id, username, password_hash, roles, created_at, updated_at
             FROM users WHERE username = ?",
            username,
        )
        .await
    }

    async fn update_user(&self, user: &UserRecord) -> Result<bool> {
        let affected = self
            .conn
            .execute(
                "UPDATE users SET username = ?, password_hash = ?, roles = ?, updated_at = ?
                 WHERE id = ?",
                (
                    user.username.as_str(),
                    user.password_hash.as_str(),
                    encode_roles(&user.roles)?,
                    user.updated_at.timestamp_millis(),
                    user.id.as_str(),
                ),
            )
            .await
            .map_err(|e| map_write_error("update user", e))?;

        Ok(affected > 0)
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM users WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete user: {}", e)))?;

        Ok(affected > 0)
    }
}
