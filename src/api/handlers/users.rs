use crate::{
    types::{
        messages, AccessTokenResponse, ApiResponse, AppError, IdQuery, LoginRequest, Result,
        SignupRequest, UpdateRequest, UserResponse,
    },
    utils::toml_config::CookieConfig,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// Login with username and password
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token in the Authorization header and data.accessToken; refresh token in a cookie", body = ApiResponse),
        (status = 401, description = "Invalid username or password", body = ApiResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response> {
    let payload = parse_body(payload)?;

    let user = state
        .credentials
        .login(&payload.username, &payload.password)
        .await?;
    let tokens = state.credentials.issue_tokens(&user)?;

    let body = ApiResponse::new(StatusCode::OK, messages::LOGIN_SUCCESS).with_data(
        &AccessTokenResponse {
            access_token: tokens.access_token.clone(),
        },
    )?;

    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, header_value(&tokens.access_token)?);
    headers.insert(
        header::SET_COOKIE,
        refresh_cookie(
            &state.config.auth.cookie,
            &tokens.refresh_token,
            state.tokens.refresh_ttl_secs(),
        )?,
    );

    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/save",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse),
        (status = 400, description = "Invalid data; `errors` lists each violated constraint", body = ApiResponse)
    ),
    tag = "users"
)]
pub async fn save(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Response> {
    let payload = parse_body(payload)?;

    let user = state
        .credentials
        .signup(&payload.username, &payload.password, &payload.roles)
        .await?;

    let body = ApiResponse::new(StatusCode::CREATED, messages::CREATED)
        .with_data(&UserResponse::from(&user))?;

    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Get the calling user
#[utoipa::path(
    get,
    path = "/user",
    params(IdQuery),
    responses(
        (status = 200, description = "User found", body = ApiResponse),
        (status = 401, description = "Invalid token or unknown user", body = ApiResponse)
    ),
    security(("access_token" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Json<ApiResponse>> {
    let id = require_id(query)?;
    let user = state.credentials.get_user(&id).await?;

    Ok(Json(
        ApiResponse::new(StatusCode::OK, messages::SUCCESS)
            .with_data(&UserResponse::from(&user))?,
    ))
}

/// Change username and/or password
///
/// Clears the caller's credentials on success; the client must log in again.
#[utoipa::path(
    put,
    path = "/update",
    params(IdQuery),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse),
        (status = 400, description = "Missing or invalid data", body = ApiResponse),
        (status = 401, description = "Invalid token or unknown user", body = ApiResponse)
    ),
    security(("access_token" = [])),
    tag = "users"
)]
pub async fn update(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    payload: std::result::Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Response> {
    let id = require_id(query)?;
    let payload = parse_body(payload)?;

    state
        .credentials
        .update(&id, payload.username.as_deref(), payload.password.as_deref())
        .await?;

    let body = ApiResponse::new(StatusCode::OK, messages::UPDATED);
    Ok((
        StatusCode::OK,
        cleared_credentials(&state.config.auth.cookie)?,
        Json(body),
    )
        .into_response())
}

/// Delete the calling user
#[utoipa::path(
    delete,
    path = "/delete",
    params(IdQuery),
    responses(
        (status = 200, description = "User deleted", body = ApiResponse),
        (status = 401, description = "Invalid token or unknown user", body = ApiResponse)
    ),
    security(("access_token" = [])),
    tag = "users"
)]
pub async fn delete(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Response> {
    let id = require_id(query)?;

    state.credentials.delete(&id).await?;

    let body = ApiResponse::new(StatusCode::OK, messages::DELETED);
    Ok((
        StatusCode::OK,
        cleared_credentials(&state.config.auth.cookie)?,
        Json(body),
    )
        .into_response())
}

/// Rotate the refresh token cookie into a new token pair
#[utoipa::path(
    get,
    path = "/refreshToken",
    params(IdQuery),
    responses(
        (status = 200, description = "New access token in the Authorization header and data.accessToken; rotated refresh cookie", body = ApiResponse),
        (status = 401, description = "Missing, invalid or expired refresh token", body = ApiResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let cookie = &state.config.auth.cookie;
    let presented = read_cookie(&headers, &cookie.name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Auth(messages::INVALID_TOKEN.to_string()))?;

    let (subject, tokens) = state.credentials.refresh_tokens(&presented)?;

    if let Some(id) = query.id.filter(|id| !id.is_empty()) {
        if id != subject {
            tracing::warn!("refresh token presented for a different user");
            return Err(AppError::Auth(messages::INVALID_TOKEN.to_string()));
        }
    }

    let body = ApiResponse::new(StatusCode::OK, messages::TOKEN_REFRESHED).with_data(
        &AccessTokenResponse {
            access_token: tokens.access_token.clone(),
        },
    )?;

    let mut out = HeaderMap::new();
    out.insert(header::AUTHORIZATION, header_value(&tokens.access_token)?);
    out.insert(
        header::SET_COOKIE,
        refresh_cookie(cookie, &tokens.refresh_token, state.tokens.refresh_ttl_secs())?,
    );

    Ok((StatusCode::OK, out, Json(body)).into_response())
}

fn parse_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(vec![rejection.body_text()]))
}

fn require_id(query: IdQuery) -> Result<String> {
    query
        .id
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingDataInRequest)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(format!("Invalid header value: {}", e)))
}

/// `Set-Cookie` value carrying the refresh token.
pub fn refresh_cookie(config: &CookieConfig, value: &str, max_age: i64) -> Result<HeaderValue> {
    let secure = if config.secure { "; Secure" } else { "" };
    header_value(&format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Strict{}",
        config.name, value, config.path, max_age, secure
    ))
}

fn cleared_credentials(config: &CookieConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static(""));
    headers.insert(header::SET_COOKIE, refresh_cookie(config, "", 0)?);
    Ok(headers)
}

/// Value of the first cookie named `name` across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
