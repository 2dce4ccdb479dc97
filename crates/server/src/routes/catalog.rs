use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use common::{pagination::Pagination, types::{OperationResult, Page}};
use models::category;
use uuid::Uuid;

use service::{
    category_service::{self, CategoryInput, CategoryUpdate},
    image_service::{self, ImageDto},
    product_service::{self, DeleteOutcome, ProductDto, ProductFilter, ProductInput, ProductUpdate},
};

use crate::{errors::JsonApiError, extract::{JsonBody, PathParam, QueryParams}, middleware::MaybeUser, routes::{ok, ApiResult}, state::ServerState};

#[utoipa::path(get, path = "/categories", tag = "catalog", responses((status = 200, description = "All categories")))]
pub async fn list_categories(State(state): State<ServerState>) -> ApiResult<Vec<category::Model>> {
    ok(category_service::list(&state.db).await?)
}

#[utoipa::path(get, path = "/categories/{id}", tag = "catalog", params(("id" = Uuid, Path, description = "Category id")), responses((status = 200, description = "Category"), (status = 404, description = "Not Found")))]
pub async fn get_category(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>) -> ApiResult<category::Model> {
    ok(category_service::get(&state.db, id).await?)
}

#[utoipa::path(post, path = "/categories", tag = "catalog", request_body = crate::openapi::CategoryRequest, responses((status = 200, description = "Created"), (status = 409, description = "Slug taken")))]
pub async fn create_category(State(state): State<ServerState>, JsonBody(input): JsonBody<CategoryInput>) -> ApiResult<category::Model> {
    ok(category_service::create(&state.db, input).await?)
}

#[utoipa::path(put, path = "/categories/{id}", tag = "catalog", params(("id" = Uuid, Path, description = "Category id")), request_body = crate::openapi::CategoryRequest, responses((status = 200, description = "Updated"), (status = 404, description = "Not Found")))]
pub async fn update_category(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>, JsonBody(input): JsonBody<CategoryUpdate>) -> ApiResult<category::Model> {
    ok(category_service::update(&state.db, id, input).await?)
}

#[utoipa::path(delete, path = "/categories/{id}", tag = "catalog", params(("id" = Uuid, Path, description = "Category id")), responses((status = 200, description = "Deleted"), (status = 409, description = "Category still in use")))]
pub async fn delete_category(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>) -> ApiResult<()> {
    category_service::delete(&state.db, id).await?;
    Ok(Json(OperationResult::done("category deleted")))
}

#[utoipa::path(get, path = "/products", tag = "catalog", params(crate::openapi::ProductQuery, crate::openapi::PageParams), responses((status = 200, description = "Products page")))]
pub async fn list_products(
    State(state): State<ServerState>,
    viewer: MaybeUser,
    QueryParams(mut filter): QueryParams<ProductFilter>,
    QueryParams(page): QueryParams<Pagination>,
) -> ApiResult<Page<ProductDto>> {
    filter.include_inactive = filter.include_inactive && viewer.is_admin();
    ok(product_service::list(&state.db, &filter, page).await?)
}

#[utoipa::path(get, path = "/products/{id}", tag = "catalog", params(("id" = Uuid, Path, description = "Product id")), responses((status = 200, description = "Product with images"), (status = 404, description = "Not Found")))]
pub async fn get_product(State(state): State<ServerState>, viewer: MaybeUser, PathParam(id): PathParam<Uuid>) -> ApiResult<ProductDto> {
    ok(product_service::get(&state.db, &state.images, id, viewer.is_admin()).await?)
}

#[utoipa::path(post, path = "/products", tag = "catalog", request_body = crate::openapi::ProductRequest, responses((status = 200, description = "Created"), (status = 400, description = "Validation Error")))]
pub async fn create_product(State(state): State<ServerState>, JsonBody(input): JsonBody<ProductInput>) -> ApiResult<ProductDto> {
    ok(product_service::create(&state.db, input).await?)
}

#[utoipa::path(put, path = "/products/{id}", tag = "catalog", params(("id" = Uuid, Path, description = "Product id")), request_body = crate::openapi::ProductRequest, responses((status = 200, description = "Updated"), (status = 404, description = "Not Found")))]
pub async fn update_product(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>, JsonBody(input): JsonBody<ProductUpdate>) -> ApiResult<ProductDto> {
    ok(product_service::update(&state.db, id, input).await?)
}

#[utoipa::path(delete, path = "/products/{id}", tag = "catalog", params(("id" = Uuid, Path, description = "Product id")), responses((status = 200, description = "Deleted, or deactivated when orders reference it"), (status = 404, description = "Not Found")))]
pub async fn delete_product(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>) -> ApiResult<DeleteOutcome> {
    let outcome = product_service::delete(&state.db, &state.images, id).await?;
    let message = match outcome {
        DeleteOutcome::Deleted => "product deleted",
        DeleteOutcome::Deactivated => "product is referenced by orders and was deactivated",
    };
    Ok(Json(OperationResult::ok_with_message(outcome, message)))
}

#[utoipa::path(get, path = "/products/{id}/images", tag = "catalog", params(("id" = Uuid, Path, description = "Product id")), responses((status = 200, description = "Images in display order")))]
pub async fn list_images(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>) -> ApiResult<Vec<ImageDto>> {
    ok(image_service::list(&state.db, &state.images, id).await?)
}

/// Multipart upload; the image is read from the `file` field.
#[utoipa::path(post, path = "/products/{id}/images", tag = "catalog", params(("id" = Uuid, Path, description = "Product id")), responses((status = 200, description = "Uploaded"), (status = 400, description = "Missing, empty, oversized or mislabelled file")))]
pub async fn upload_image(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>, multipart: Result<Multipart, MultipartRejection>) -> ApiResult<ImageDto> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await.map_err(|e| JsonApiError::bad_request(e.body_text()))? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| JsonApiError::bad_request(e.body_text()))?;
        return ok(image_service::upload(&state.db, &state.images, id, &content_type, &bytes).await?);
    }
    Err(JsonApiError::bad_request("multipart field `file` is required"))
}

#[utoipa::path(delete, path = "/images/{id}", tag = "catalog", params(("id" = Uuid, Path, description = "Image id")), responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found")))]
pub async fn delete_image(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>) -> ApiResult<()> {
    image_service::delete(&state.db, &state.images, id).await?;
    Ok(Json(OperationResult::done("image deleted")))
}
