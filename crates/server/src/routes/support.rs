use axum::{extract::State, Json};
use common::{pagination::Pagination, types::{OperationResult, Page}};
use models::support_request::{self, SupportStatus};
use serde::Deserialize;
use uuid::Uuid;

use service::{newsletter_service::{self, BroadcastReport}, support_service::{self, SupportInput}};

use crate::{extract::{JsonBody, PathParam, QueryParams}, middleware::MaybeUser, routes::{ok, ApiResult}, state::ServerState};

#[derive(Debug, Deserialize)]
pub struct SupportFilter {
    pub status: Option<SupportStatus>,
}

#[derive(Debug, Deserialize)]
pub struct EmailInput {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastInput {
    pub subject: String,
    pub html: String,
}

#[utoipa::path(post, path = "/support", tag = "support", request_body = crate::openapi::SupportRequestDoc, responses((status = 200, description = "Request stored and forwarded"), (status = 400, description = "Validation Error")))]
pub async fn submit(State(state): State<ServerState>, caller: MaybeUser, JsonBody(input): JsonBody<SupportInput>) -> ApiResult<support_request::Model> {
    let user_id = caller.0.map(|u| u.id);
    let created = support_service::submit(&state.db, state.mailer.as_ref(), &state.support_inbox, user_id, input).await?;
    Ok(Json(OperationResult::ok_with_message(created, "thanks, we will get back to you")))
}

#[utoipa::path(get, path = "/admin/support", tag = "support", params(crate::openapi::SupportStatusQuery, crate::openapi::PageParams), responses((status = 200, description = "Support requests, newest first")))]
pub async fn list(State(state): State<ServerState>, QueryParams(filter): QueryParams<SupportFilter>, QueryParams(page): QueryParams<Pagination>) -> ApiResult<Page<support_request::Model>> {
    ok(support_service::list(&state.db, filter.status, page).await?)
}

#[utoipa::path(post, path = "/admin/support/{id}/resolve", tag = "support", params(("id" = Uuid, Path, description = "Request id")), responses((status = 200, description = "Resolved"), (status = 404, description = "Not Found")))]
pub async fn resolve(State(state): State<ServerState>, PathParam(id): PathParam<Uuid>) -> ApiResult<support_request::Model> {
    ok(support_service::resolve(&state.db, id).await?)
}

#[utoipa::path(post, path = "/newsletter/subscribe", tag = "newsletter", request_body = crate::openapi::EmailRequest, responses((status = 200, description = "Subscribed"), (status = 400, description = "Invalid email")))]
pub async fn subscribe(State(state): State<ServerState>, JsonBody(input): JsonBody<EmailInput>) -> ApiResult<()> {
    newsletter_service::subscribe(&state.db, &input.email).await?;
    Ok(Json(OperationResult::done("subscribed")))
}

#[utoipa::path(post, path = "/newsletter/unsubscribe", tag = "newsletter", request_body = crate::openapi::EmailRequest, responses((status = 200, description = "Unsubscribed")))]
pub async fn unsubscribe(State(state): State<ServerState>, JsonBody(input): JsonBody<EmailInput>) -> ApiResult<()> {
    let removed = newsletter_service::unsubscribe(&state.db, &input.email).await?;
    let message = if removed { "unsubscribed" } else { "address was not subscribed" };
    Ok(Json(OperationResult::done(message)))
}

#[utoipa::path(get, path = "/admin/newsletter", tag = "newsletter", params(crate::openapi::PageParams), responses((status = 200, description = "Subscribers")))]
pub async fn subscribers(State(state): State<ServerState>, QueryParams(page): QueryParams<Pagination>) -> ApiResult<Page<models::news_subscription::Model>> {
    ok(newsletter_service::list(&state.db, page).await?)
}

#[utoipa::path(post, path = "/admin/newsletter/broadcast", tag = "newsletter", request_body = crate::openapi::BroadcastRequest, responses((status = 200, description = "Delivery report")))]
pub async fn broadcast(State(state): State<ServerState>, JsonBody(input): JsonBody<BroadcastInput>) -> ApiResult<BroadcastReport> {
    ok(newsletter_service::broadcast(&state.db, state.mailer.as_ref(), &input.subject, &input.html).await?)
}
