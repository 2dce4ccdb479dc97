pub mod account;
pub mod auth;
pub mod catalog;
pub mod orders;
pub mod shipping;
pub mod statistics;
pub mod support;
pub mod wishlist;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use common::types::{Health, OperationResult};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::JsonApiError;
use crate::middleware::{require_admin, require_user};
use crate::openapi::ApiDoc;
use crate::state::ServerState;

pub type ApiResult<T> = Result<Json<OperationResult<T>>, JsonApiError>;

pub(crate) fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(OperationResult::ok(data)))
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: public, signed-in and admin groups,
/// uploaded images, and the OpenAPI docs.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    // multipart framing on top of the image itself
    let upload_limit = state.images.max_bytes + 64 * 1024;
    let images_prefix = state.images.public_prefix.clone();
    let images_dir = ServeDir::new(state.images.dir.clone());

    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/google", post(auth::google))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/confirm-email", post(auth::confirm_email).get(auth::confirm_email_link))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/categories", get(catalog::list_categories))
        .route("/categories/:id", get(catalog::get_category))
        .route("/products", get(catalog::list_products))
        .route("/products/:id", get(catalog::get_product))
        .route("/products/:id/images", get(catalog::list_images))
        .route("/support", post(support::submit))
        .route("/newsletter/subscribe", post(support::subscribe))
        .route("/newsletter/unsubscribe", post(support::unsubscribe))
        .route("/shipping/cities", get(shipping::cities))
        .route("/shipping/warehouses", get(shipping::warehouses));

    let signed_in = Router::new()
        .route("/account/me", get(account::me).put(account::update_me))
        .route("/account/change-password", post(account::change_password))
        .route("/orders", post(orders::create_order).get(orders::list_my_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/checkout/:order_id", post(orders::start_checkout))
        .route("/checkout/confirm/:session_id", post(orders::confirm_checkout))
        .route("/wishlist", get(wishlist::list).post(wishlist::add).delete(wishlist::clear))
        .route("/wishlist/:product_id", delete(wishlist::remove))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let admin = Router::new()
        .route("/admin/users", get(account::list_users))
        .route("/admin/users/:id/status", put(account::set_user_status))
        .route("/categories", post(catalog::create_category))
        .route("/categories/:id", put(catalog::update_category).delete(catalog::delete_category))
        .route("/products", post(catalog::create_product))
        .route("/products/:id", put(catalog::update_product).delete(catalog::delete_product))
        .route(
            "/products/:id/images",
            post(catalog::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/images/:id", delete(catalog::delete_image))
        .route("/admin/orders", get(orders::list_all_orders))
        .route("/admin/orders/:id/status", put(orders::update_order_status))
        .route("/admin/statistics/sales", get(statistics::sales))
        .route("/admin/statistics/top-products", get(statistics::top_products))
        .route("/admin/statistics/summary", get(statistics::summary))
        .route("/admin/support", get(support::list))
        .route("/admin/support/:id/resolve", post(support::resolve))
        .route("/admin/newsletter", get(support::subscribers))
        .route("/admin/newsletter/broadcast", post(support::broadcast))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    public
        .merge(signed_in)
        .merge(admin)
        .with_state(state)
        .nest_service(&images_prefix, images_dir)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
