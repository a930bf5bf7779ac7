//! HTTP API Handlers and Routes
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Public
//! - `POST /login` - Exchange username/password for an access token and refresh cookie
//! - `POST /save` - Register a new user
//! - `GET /refreshToken` - Rotate the refresh cookie into a new token pair
//! - `GET /health` - Health check
//! - `GET /api-docs/openapi.json` - OpenAPI document
//!
//! ## Protected (`?id=<user id>` plus `Authorization`)
//! - `GET /user` - Fetch the user
//! - `PUT /update` - Change username and/or password
//! - `DELETE /delete` - Remove the user
//!
//! # Authentication
//!
//! The access token goes in the `Authorization` header, bare or with a
//! `Bearer ` prefix:
//! ```text
//! Authorization: <token>
//! ```
//! It is only accepted for the user ID named in the same request.
//!
//! Every response body is an envelope:
//! ```text
//! {"status": "OK", "message": "...", "data": {...}, "errors": ["..."]}
//! ```

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::types::{
    AccessTokenResponse, ApiResponse, LoginRequest, Role, SignupRequest, UpdateRequest, UserResponse,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::login,
        handlers::users::save,
        handlers::users::get_user,
        handlers::users::update,
        handlers::users::delete,
        handlers::users::refresh_token,
    ),
    components(schemas(
        LoginRequest,
        SignupRequest,
        UpdateRequest,
        UserResponse,
        AccessTokenResponse,
        ApiResponse,
        Role,
    )),
    modifiers(&AccessTokenHeader),
    tags(
        (name = "auth", description = "Login and token refresh"),
        (name = "users", description = "User registration and account management")
    )
)]
pub struct ApiDoc;

struct AccessTokenHeader;

impl Modify for AccessTokenHeader {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "access_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}
