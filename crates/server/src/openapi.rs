//! OpenAPI document. Request shapes are mirrored here so the service crate
//! stays free of `utoipa`.

use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest { pub email: String, pub name: String, pub password: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct GoogleLoginRequest { pub id_token: String }

#[derive(ToSchema)]
pub struct TokenRequest { pub token: String }

#[derive(ToSchema)]
pub struct EmailRequest { pub email: String }

#[derive(ToSchema)]
pub struct ResetPasswordRequest { pub token: String, pub new_password: String }

#[derive(ToSchema)]
pub struct ProfileUpdateRequest { pub name: Option<String>, pub phone: Option<String> }

#[derive(ToSchema)]
pub struct ChangePasswordRequest { pub current_password: String, pub new_password: String }

#[derive(ToSchema)]
pub struct UserStatusRequest {
    /// `active` or `disabled`
    pub status: String,
}

#[derive(ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(ToSchema)]
pub struct ProductRequest {
    pub category_id: Uuid,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price_cents: i64,
    /// 0..=100
    pub discount_percent: Option<i32>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(ToSchema)]
pub struct OrderLineDoc { pub product_id: Uuid, pub quantity: i32 }

#[derive(ToSchema)]
pub struct ShippingInfoDoc {
    pub recipient_name: String,
    pub phone: String,
    pub city: String,
    pub warehouse: String,
    pub comment: Option<String>,
}

#[derive(ToSchema)]
pub struct CreateOrderRequest { pub items: Vec<OrderLineDoc>, pub shipping: ShippingInfoDoc }

#[derive(ToSchema)]
pub struct OrderStatusRequest {
    /// `pending`, `processing`, `shipped`, `delivered` or `cancelled`
    pub status: String,
}

#[derive(ToSchema)]
pub struct WishListRequest { pub product_id: Uuid }

#[derive(ToSchema)]
pub struct SupportRequestDoc { pub name: String, pub email: String, pub subject: String, pub message: String }

#[derive(ToSchema)]
pub struct BroadcastRequest { pub subject: String, pub html: String }

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based, default 1
    pub page: Option<u32>,
    /// 1..=100, default 20
    pub per_page: Option<u32>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
    /// Case-insensitive match on name and description
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
    /// Admins only
    pub include_inactive: Option<bool>,
    /// `newest`, `price_asc`, `price_desc` or `name`
    pub sort: Option<String>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderStatusQuery { pub status: Option<String> }

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SupportStatusQuery {
    /// `open` or `resolved`
    pub status: Option<String>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesParams {
    /// `day`, `month`, `year` or `all_time`
    pub grouping: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    pub from: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    pub to: Option<String>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopProductsParams {
    pub limit: Option<u32>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CityParams { pub q: String }

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WarehouseParams { pub city_ref: String }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::google,
        crate::routes::auth::logout,
        crate::routes::auth::confirm_email,
        crate::routes::auth::forgot_password,
        crate::routes::auth::reset_password,
        crate::routes::account::me,
        crate::routes::account::update_me,
        crate::routes::account::change_password,
        crate::routes::account::list_users,
        crate::routes::account::set_user_status,
        crate::routes::catalog::list_categories,
        crate::routes::catalog::get_category,
        crate::routes::catalog::create_category,
        crate::routes::catalog::update_category,
        crate::routes::catalog::delete_category,
        crate::routes::catalog::list_products,
        crate::routes::catalog::get_product,
        crate::routes::catalog::create_product,
        crate::routes::catalog::update_product,
        crate::routes::catalog::delete_product,
        crate::routes::catalog::list_images,
        crate::routes::catalog::upload_image,
        crate::routes::catalog::delete_image,
        crate::routes::orders::create_order,
        crate::routes::orders::list_my_orders,
        crate::routes::orders::get_order,
        crate::routes::orders::cancel_order,
        crate::routes::orders::start_checkout,
        crate::routes::orders::confirm_checkout,
        crate::routes::orders::list_all_orders,
        crate::routes::orders::update_order_status,
        crate::routes::wishlist::list,
        crate::routes::wishlist::add,
        crate::routes::wishlist::remove,
        crate::routes::wishlist::clear,
        crate::routes::statistics::sales,
        crate::routes::statistics::top_products,
        crate::routes::statistics::summary,
        crate::routes::support::submit,
        crate::routes::support::list,
        crate::routes::support::resolve,
        crate::routes::support::subscribe,
        crate::routes::support::unsubscribe,
        crate::routes::support::subscribers,
        crate::routes::support::broadcast,
        crate::routes::shipping::cities,
        crate::routes::shipping::warehouses,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            GoogleLoginRequest,
            TokenRequest,
            EmailRequest,
            ResetPasswordRequest,
            ProfileUpdateRequest,
            ChangePasswordRequest,
            UserStatusRequest,
            CategoryRequest,
            ProductRequest,
            OrderLineDoc,
            ShippingInfoDoc,
            CreateOrderRequest,
            OrderStatusRequest,
            WishListRequest,
            SupportRequestDoc,
            BroadcastRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "account"),
        (name = "admin"),
        (name = "catalog"),
        (name = "orders"),
        (name = "checkout"),
        (name = "wishlist"),
        (name = "statistics"),
        (name = "support"),
        (name = "newsletter"),
        (name = "shipping"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_storefront_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for p in ["/health", "/auth/login", "/products/{id}", "/checkout/confirm/{session_id}", "/admin/statistics/sales"] {
            assert!(paths.contains_key(p), "missing {p}");
        }
    }
}
