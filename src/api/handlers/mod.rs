//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Login, signup, account changes and token refresh.
pub mod users;

use crate::api::ApiDoc;
use axum::Json;
use utoipa::OpenApi;

/// Liveness probe
pub async fn health() -> &'static str {
    "OK"
}

/// OpenAPI document for every route
pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
