//! Persistence layer: sea-orm entities, model-level validation and the
//! connection factory.

pub mod errors;
pub mod db;
pub mod user;
pub mod user_credentials;
pub mod user_token;
pub mod category;
pub mod product;
pub mod product_image;
pub mod order;
pub mod order_item;
pub mod wish_list_item;
pub mod support_request;
pub mod news_subscription;
