use crate::api::handlers::{self, users};
use crate::auth::middleware::auth_gate;
use crate::AppState;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Builds the full application router.
///
/// Every route sits behind the auth gate; the public ones are exempted by
/// the configured ignored paths rather than by being mounted separately.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api-docs/openapi.json", get(handlers::openapi))
        .route("/login", post(users::login))
        .route("/save", post(users::save))
        .route("/refreshToken", get(users::refresh_token))
        .route("/user", get(users::get_user))
        .route("/update", put(users::update))
        .route("/delete", delete(users::delete))
        .layer(middleware::from_fn_with_state(state.gate.clone(), auth_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
