use axum::{extract::State, Extension};
use common::{pagination::Pagination, types::Page};
use models::order::OrderStatus;
use serde::Deserialize;
use uuid::Uuid;

use service::{
    auth::domain::CurrentUser,
    checkout::{self, CheckoutSession, ConfirmOutcome},
    order_service::{self, CreateOrderInput, OrderDto},
};

use crate::{extract::{JsonBody, PathParam, QueryParams}, routes::{ok, ApiResult}, state::ServerState};

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: OrderStatus,
}

#[utoipa::path(post, path = "/orders", tag = "orders", request_body = crate::openapi::CreateOrderRequest, responses((status = 200, description = "Order placed"), (status = 400, description = "Validation Error"), (status = 409, description = "Insufficient stock")))]
pub async fn create_order(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, JsonBody(input): JsonBody<CreateOrderInput>) -> ApiResult<OrderDto> {
    ok(order_service::create(&state.db, state.mailer.as_ref(), &user, input).await?)
}

#[utoipa::path(get, path = "/orders", tag = "orders", params(crate::openapi::PageParams), responses((status = 200, description = "Own orders, newest first")))]
pub async fn list_my_orders(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, QueryParams(page): QueryParams<Pagination>) -> ApiResult<Page<OrderDto>> {
    ok(order_service::list_mine(&state.db, user.id, page).await?)
}

#[utoipa::path(get, path = "/orders/{id}", tag = "orders", params(("id" = Uuid, Path, description = "Order id")), responses((status = 200, description = "Order"), (status = 404, description = "Not Found")))]
pub async fn get_order(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, PathParam(id): PathParam<Uuid>) -> ApiResult<OrderDto> {
    ok(order_service::get(&state.db, &user, id).await?)
}

#[utoipa::path(post, path = "/orders/{id}/cancel", tag = "orders", params(("id" = Uuid, Path, description = "Order id")), responses((status = 200, description = "Cancelled and stock restored"), (status = 400, description = "Order can no longer be cancelled")))]
pub async fn cancel_order(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, PathParam(id): PathParam<Uuid>) -> ApiResult<OrderDto> {
    ok(order_service::cancel(&state.db, user.id, id).await?)
}

#[utoipa::path(post, path = "/checkout/{order_id}", tag = "checkout", params(("order_id" = Uuid, Path, description = "Order id")), responses((status = 200, description = "Hosted payment page created"), (status = 400, description = "Order not payable"), (status = 502, description = "Payment provider unavailable")))]
pub async fn start_checkout(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, PathParam(id): PathParam<Uuid>) -> ApiResult<CheckoutSession> {
    ok(checkout::create_session(&state.db, state.payments.as_ref(), &state.checkout, &user, id).await?)
}

#[utoipa::path(post, path = "/checkout/confirm/{session_id}", tag = "checkout", params(("session_id" = String, Path, description = "Stripe checkout session id")), responses((status = 200, description = "Payment state of the order"), (status = 400, description = "Session does not match the order")))]
pub async fn confirm_checkout(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>, PathParam(session_id): PathParam<String>) -> ApiResult<ConfirmOutcome> {
    ok(checkout::confirm(&state.db, state.payments.as_ref(), &user, &session_id).await?)
}

#[utoipa::path(get, path = "/admin/orders", tag = "admin", params(crate::openapi::OrderStatusQuery, crate::openapi::PageParams), responses((status = 200, description = "All orders")))]
pub async fn list_all_orders(State(state): State<ServerState>, QueryParams(filter): QueryParams<StatusFilter>, QueryParams(page): QueryParams<Pagination>) -> ApiResult<Page<OrderDto>> {
    ok(order_service::list_all(&state.db, filter.status, page).await?)
}

#[utoipa::path(put, path = "/admin/orders/{id}/status", tag = "admin", params(("id" = Uuid, Path, description = "Order id")), request_body = crate::openapi::OrderStatusRequest, responses((status = 200, description = "Status changed"), (status = 400, description = "Transition not allowed")))]
pub async fn update_order_status(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>, JsonBody(input): JsonBody<StatusInput>) -> ApiResult<OrderDto> {
    ok(order_service::update_status(&state.db, id, input.status).await?)
}
