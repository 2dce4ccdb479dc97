use axum::{extract::State, Extension, Json};
use common::types::OperationResult;
use serde::Deserialize;
use uuid::Uuid;

use service::{auth::domain::CurrentUser, wishlist_service::{self, WishListEntry}};

use crate::{extract::{JsonBody, PathParam}, routes::{ok, ApiResult}, state::ServerState};

#[derive(Debug, Deserialize)]
pub struct AddInput {
    pub product_id: Uuid,
}

#[utoipa::path(get, path = "/wishlist", tag = "wishlist", responses((status = 200, description = "Saved products, newest first")))]
pub async fn list(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<WishListEntry>> {
    ok(wishlist_service::list(&state.db, user.id).await?)
}

#[utoipa::path(post, path = "/wishlist", tag = "wishlist", request_body = crate::openapi::WishListRequest, responses((status = 200, description = "Saved"), (status = 404, description = "Unknown product")))]
pub async fn add(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, JsonBody(input): JsonBody<AddInput>) -> ApiResult<()> {
    wishlist_service::add(&state.db, user.id, input.product_id).await?;
    Ok(Json(OperationResult::done("added to wish list")))
}

#[utoipa::path(delete, path = "/wishlist/{product_id}", tag = "wishlist", params(("product_id" = Uuid, Path, description = "Product id")), responses((status = 200, description = "Removed")))]
pub async fn remove(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, PathParam(product_id): PathParam<Uuid>) -> ApiResult<()> {
    wishlist_service::remove(&state.db, user.id, product_id).await?;
    Ok(Json(OperationResult::done("removed from wish list")))
}

#[utoipa::path(delete, path = "/wishlist", tag = "wishlist", responses((status = 200, description = "Number of removed entries")))]
pub async fn clear(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>) -> ApiResult<u64> {
    ok(wishlist_service::clear(&state.db, user.id).await?)
}
