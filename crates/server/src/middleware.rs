//! Token authentication: `Authorization: Bearer <jwt>` or the `auth_token`
//! cookie. Verified callers are stored as `CurrentUser` in request extensions.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service::auth::domain::CurrentUser;
use tracing::warn;

use crate::errors::JsonApiError;
use crate::state::ServerState;

pub const AUTH_COOKIE: &str = "auth_token";

/// Bearer header wins over the cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(h) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return h.strip_prefix("Bearer ").map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    }
    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

async fn authenticate(state: &ServerState, headers: &HeaderMap) -> Result<CurrentUser, JsonApiError> {
    let token = token_from_headers(headers).ok_or_else(JsonApiError::unauthorized)?;
    state.auth.authenticate(&token).await.map_err(|e| {
        warn!(error = %e, code = e.code(), "token validation failed");
        JsonApiError::new(axum::http::StatusCode::UNAUTHORIZED, "Unauthorized", Some("invalid or expired token".into()))
    })
}

pub async fn require_user(State(state): State<ServerState>, mut req: Request, next: Next) -> Result<Response, JsonApiError> {
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn require_admin(State(state): State<ServerState>, mut req: Request, next: Next) -> Result<Response, JsonApiError> {
    let user = authenticate(&state, req.headers()).await?;
    if !user.is_admin() {
        warn!(user_id = %user.id, path = %req.uri().path(), "admin route denied");
        return Err(JsonApiError::new(axum::http::StatusCode::FORBIDDEN, "Forbidden", Some("admin role required".into())));
    }
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Caller identity on public routes; absent or invalid tokens yield `None`.
pub struct MaybeUser(pub Option<CurrentUser>);

#[async_trait]
impl FromRequestParts<ServerState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate(state, &parts.headers).await.ok()))
    }
}

impl MaybeUser {
    pub fn is_admin(&self) -> bool { self.0.as_ref().map(CurrentUser::is_admin).unwrap_or(false) }
}
