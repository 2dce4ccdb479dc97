use axum::{extract::State, Extension, Json};
use common::{pagination::Pagination, types::{OperationResult, Page}};
use serde::Deserialize;
use uuid::Uuid;

use models::user::UserStatus;
use service::{account_service::{ProfileUpdate, UserDto}, auth::domain::CurrentUser};

use crate::{extract::{JsonBody, PathParam, QueryParams}, routes::{ok, ApiResult}, state::ServerState};

#[derive(Debug, Deserialize)]
pub struct ChangePasswordInput { pub current_password: String, pub new_password: String }

#[derive(Debug, Deserialize)]
pub struct StatusInput { pub status: UserStatus }

#[utoipa::path(get, path = "/account/me", tag = "account", responses((status = 200, description = "Current profile"), (status = 401, description = "Unauthorized")))]
pub async fn me(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>) -> ApiResult<UserDto> {
    ok(state.accounts.get_profile(user.id).await?)
}

#[utoipa::path(put, path = "/account/me", tag = "account", request_body = crate::openapi::ProfileUpdateRequest, responses((status = 200, description = "Profile updated"), (status = 400, description = "Validation Error")))]
pub async fn update_me(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, JsonBody(input): JsonBody<ProfileUpdate>) -> ApiResult<UserDto> {
    ok(state.accounts.update_profile(user.id, input).await?)
}

#[utoipa::path(post, path = "/account/change-password", tag = "account", request_body = crate::openapi::ChangePasswordRequest, responses((status = 200, description = "Password changed"), (status = 401, description = "Current password is wrong")))]
pub async fn change_password(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, JsonBody(input): JsonBody<ChangePasswordInput>) -> ApiResult<()> {
    state.accounts.change_password(user.id, &input.current_password, &input.new_password).await?;
    Ok(Json(OperationResult::done("password changed")))
}

#[utoipa::path(get, path = "/admin/users", tag = "admin", params(crate::openapi::PageParams), responses((status = 200, description = "Users page"), (status = 403, description = "Forbidden")))]
pub async fn list_users(State(state): State<ServerState>, QueryParams(page): QueryParams<Pagination>) -> ApiResult<Page<UserDto>> {
    ok(state.accounts.list_users(page).await?)
}

#[utoipa::path(put, path = "/admin/users/{id}/status", tag = "admin", params(("id" = Uuid, Path, description = "User id")), request_body = crate::openapi::UserStatusRequest, responses((status = 200, description = "Status changed"), (status = 404, description = "Not Found")))]
pub async fn set_user_status(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>, JsonBody(input): JsonBody<StatusInput>) -> ApiResult<UserDto> {
    ok(state.accounts.set_user_status(id, input.status).await?)
}
