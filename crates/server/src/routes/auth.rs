use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::types::OperationResult;
use serde::Deserialize;
use tracing::info;

use service::auth::domain::{AuthSession, AuthUser, LoginInput, RegisterInput};

use crate::{errors::JsonApiError, extract::{JsonBody, QueryParams}, middleware::AUTH_COOKIE, routes::{ok, ApiResult}, state::ServerState};

#[derive(Debug, Deserialize)]
pub struct TokenInput { pub token: String }

#[derive(Debug, Deserialize)]
pub struct EmailInput { pub email: String }

#[derive(Debug, Deserialize)]
pub struct ResetPasswordInput { pub token: String, pub new_password: String }

#[derive(Debug, Deserialize)]
pub struct GoogleInput { pub id_token: String }

fn session_cookie(state: &ServerState, token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(state.secure_cookies);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

#[utoipa::path(post, path = "/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 200, description = "Registered; confirmation email sent"), (status = 400, description = "Validation Error"), (status = 409, description = "Conflict")))]
pub async fn register(State(state): State<ServerState>, JsonBody(input): JsonBody<RegisterInput>) -> ApiResult<AuthUser> {
    let user = state.accounts.register(input).await?;
    Ok(Json(OperationResult::ok_with_message(user, "registered; check your inbox to confirm the email address")))
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In; sets auth_token cookie"), (status = 401, description = "Unauthorized")))]
pub async fn login(State(state): State<ServerState>, jar: CookieJar, JsonBody(input): JsonBody<LoginInput>) -> Result<(CookieJar, Json<OperationResult<AuthSession>>), JsonApiError> {
    let session = state.accounts.login(input).await?;
    let jar = jar.add(session_cookie(&state, session.token.clone()));
    Ok((jar, Json(OperationResult::ok(session))))
}

#[utoipa::path(post, path = "/auth/google", tag = "auth", request_body = crate::openapi::GoogleLoginRequest, responses((status = 200, description = "Logged In"), (status = 401, description = "Invalid Google token"), (status = 502, description = "Google unavailable")))]
pub async fn google(State(state): State<ServerState>, jar: CookieJar, JsonBody(input): JsonBody<GoogleInput>) -> Result<(CookieJar, Json<OperationResult<AuthSession>>), JsonApiError> {
    let session = state.accounts.google_login(state.google.as_ref(), &input.id_token).await?;
    info!(user_id = %session.user.id, "google_login");
    let jar = jar.add(session_cookie(&state, session.token.clone()));
    Ok((jar, Json(OperationResult::ok(session))))
}

#[utoipa::path(post, path = "/auth/logout", tag = "auth", responses((status = 200, description = "Cookie cleared")))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<OperationResult<()>>) {
    let mut gone = Cookie::from(AUTH_COOKIE);
    gone.set_path("/");
    (jar.remove(gone), Json(OperationResult::done("logged out")))
}

#[utoipa::path(post, path = "/auth/confirm-email", tag = "auth", request_body = crate::openapi::TokenRequest, responses((status = 200, description = "Email confirmed"), (status = 400, description = "Invalid or expired token")))]
pub async fn confirm_email(State(state): State<ServerState>, JsonBody(input): JsonBody<TokenInput>) -> ApiResult<service::account_service::UserDto> {
    ok(state.accounts.confirm_email(&input.token).await?)
}

/// Same as `confirm_email`, for the link in the confirmation message.
pub async fn confirm_email_link(State(state): State<ServerState>, QueryParams(input): QueryParams<TokenInput>) -> ApiResult<service::account_service::UserDto> {
    ok(state.accounts.confirm_email(&input.token).await?)
}

#[utoipa::path(post, path = "/auth/forgot-password", tag = "auth", request_body = crate::openapi::EmailRequest, responses((status = 200, description = "Accepted whether or not the email is registered")))]
pub async fn forgot_password(State(state): State<ServerState>, JsonBody(input): JsonBody<EmailInput>) -> ApiResult<()> {
    state.accounts.forgot_password(&input.email).await?;
    Ok(Json(OperationResult::done("if the address is registered, a reset link has been sent")))
}

#[utoipa::path(post, path = "/auth/reset-password", tag = "auth", request_body = crate::openapi::ResetPasswordRequest, responses((status = 200, description = "Password changed"), (status = 400, description = "Invalid token or weak password")))]
pub async fn reset_password(State(state): State<ServerState>, JsonBody(input): JsonBody<ResetPasswordInput>) -> ApiResult<()> {
    state.accounts.reset_password(&input.token, &input.new_password).await?;
    Ok(Json(OperationResult::done("password changed")))
}
