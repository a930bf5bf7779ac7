use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

/// Response messages shared by handlers and the auth gate.
pub mod messages {
    pub const SUCCESS: &str = "Success";
    pub const LOGIN_SUCCESS: &str = "Login with success";
    pub const CREATED: &str = "User successfully created";
    pub const UPDATED: &str = "User successfully updated";
    pub const DELETED: &str = "User successfully deleted";
    pub const TOKEN_REFRESHED: &str = "Token refreshed Successfully";
    pub const INVALID_TOKEN: &str = "Invalid token";
    pub const INVALID_DATA: &str = "Invalid data";
    pub const BODY_TOO_LARGE: &str = "Request body too large";
    pub const INTERNAL_ERROR: &str = "Internal server error";
}

// ============= User Types =============

/// Roles a user can hold. The set is closed; anything else is rejected at signup.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(format!("roles: unrecognized role '{}'", other)),
        }
    }
}

/// A stored user. The password hash never leaves the service layer.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============= API Request/Response Types =============

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    /// Role names, e.g. `["USER"]`. Validated against [`Role`].
    pub roles: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// `?id=` query parameter carried by every protected route.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    /// ID of the user the caller claims to be
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub roles: Vec<Role>,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            roles: user.roles.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Standard envelope returned by every endpoint. The HTTP status code travels
/// out-of-band; `status` repeats its canonical text.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.canonical_reason().unwrap_or_default().to_string(),
            message: message.into(),
            data: None,
            errors: None,
        }
    }

    pub fn with_data<T: Serialize>(mut self, data: &T) -> Result<Self> {
        let value = serde_json::to_value(data)
            .map_err(|e| AppError::Internal(format!("Failed to serialize response: {}", e)))?;
        self.data = Some(value);
        Ok(self)
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = Some(errors);
        self
    }
}

// ============= Authentication Types =============

/// An access/refresh token pair minted for one subject at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Claims carried by both access and refresh tokens. The kind of token is
/// decided by where it travels (header vs cookie), not by a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Immutable user ID
    pub sub: String,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Unique token ID
    pub jti: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid data: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("invalid username or password")]
    UsernameOrPasswordMismatch,

    #[error("missing data in request")]
    MissingDataInRequest,

    #[error("{0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::new(StatusCode::BAD_REQUEST, messages::INVALID_DATA)
                    .with_errors(errors),
            ),
            AppError::MissingDataInRequest => (
                StatusCode::BAD_REQUEST,
                ApiResponse::new(StatusCode::BAD_REQUEST, self.to_string()),
            ),
            AppError::UsernameOrPasswordMismatch | AppError::NotFound(_) => (
                StatusCode::UNAUTHORIZED,
                ApiResponse::new(StatusCode::UNAUTHORIZED, self.to_string()),
            ),
            AppError::Auth(msg) => (
                StatusCode::UNAUTHORIZED,
                ApiResponse::new(StatusCode::UNAUTHORIZED, msg),
            ),
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::new(StatusCode::INTERNAL_SERVER_ERROR, messages::INTERNAL_ERROR),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
