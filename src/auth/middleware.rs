use crate::auth::session::SessionTokenManager;
use crate::types::{messages, ApiResponse, IdQuery};
use axum::{
    body::{to_bytes, Body},
    extract::{Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;

/// Largest request body buffered while looking for an `id` field. Larger
/// JSON bodies on protected routes are refused with 413.
pub const MAX_IDENTITY_BODY: usize = 64 * 1024;

/// Outcome of running a request through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Path is exempt from token checks
    Bypassed,
    /// Token verified and bound to the claimed identity
    Allowed,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingIdentity,
    InvalidToken,
}

/// Decides, per request, whether the caller holds a valid access token for
/// the identity it claims.
pub struct AuthGate {
    tokens: Arc<SessionTokenManager>,
    ignored_paths: Vec<String>,
}

impl AuthGate {
    /// `ignored_paths` entries match exactly, or by prefix when they end in `*`.
    pub fn new<I, S>(tokens: Arc<SessionTokenManager>, ignored_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens,
            ignored_paths: ignored_paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_ignored_path(&self, path: &str) -> bool {
        self.ignored_paths.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => pattern == path,
        })
    }

    pub fn decide(&self, path: &str, identity: Option<&str>, token: &str) -> GateDecision {
        if self.is_ignored_path(path) {
            return GateDecision::Bypassed;
        }

        let Some(identity) = identity.filter(|id| !id.is_empty()) else {
            return GateDecision::Rejected(RejectReason::MissingIdentity);
        };

        if self.tokens.validate_access_token(identity, token) {
            GateDecision::Allowed
        } else {
            GateDecision::Rejected(RejectReason::InvalidToken)
        }
    }
}

/// Axum middleware wrapping every route with [`AuthGate`].
///
/// The identity comes from the `id` query parameter, falling back to an `id`
/// field in a JSON body. The token is read from `Authorization`, with or
/// without a `Bearer ` prefix. Nothing is added to the request on success.
///
/// A JSON body that has to be inspected for the identity and exceeds
/// [`MAX_IDENTITY_BODY`] gets `413 Payload Too Large` before any token check.
pub async fn auth_gate(State(gate): State<Arc<AuthGate>>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if gate.is_ignored_path(&path) {
        return next.run(req).await;
    }

    let (req, identity) = match extract_identity(req).await {
        Ok(found) => found,
        Err(response) => return response,
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.strip_prefix("Bearer ").unwrap_or(h).trim())
        .unwrap_or_default()
        .to_string();

    match gate.decide(&path, identity.as_deref(), &token) {
        GateDecision::Bypassed | GateDecision::Allowed => next.run(req).await,
        GateDecision::Rejected(reason) => {
            warn!(%path, ?reason, "request rejected by auth gate");
            unauthorized()
        }
    }
}

async fn extract_identity(req: Request) -> Result<(Request, Option<String>), Response> {
    let from_query = Query::<IdQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.id)
        .filter(|id| !id.is_empty());
    if from_query.is_some() {
        return Ok((req, from_query));
    }

    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !is_json {
        return Ok((req, None));
    }

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_IDENTITY_BODY).await.map_err(|e| {
        warn!(error = %e, "request body rejected by auth gate");
        payload_too_large()
    })?;
    let from_body = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_owned));

    Ok((Request::from_parts(parts, Body::from(bytes)), from_body))
}

/// 401 envelope with the `Authorization` header blanked so a stale token is
/// not carried forward by the client.
pub fn unauthorized() -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::new(
            StatusCode::UNAUTHORIZED,
            messages::INVALID_TOKEN,
        )),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::AUTHORIZATION, HeaderValue::from_static(""));
    response
}

fn payload_too_large() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ApiResponse::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            messages::BODY_TOO_LARGE,
        )),
    )
        .into_response()
}
