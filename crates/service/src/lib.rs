//! Service layer providing business operations on top of models.
//! - Separates business logic from data access.
//! - Reuses validation and entity definitions in `models` crate.
//! - External systems (mail, Stripe, Google, Nova Poshta) sit behind traits
//!   with HTTP clients for production and in-memory fakes for tests.

pub mod errors;
pub mod auth;
pub mod mail;
pub mod google;
pub mod account_service;
pub mod category_service;
pub mod product_service;
pub mod image_service;
pub mod order_service;
pub mod checkout;
pub mod wishlist_service;
pub mod statistics_service;
pub mod support_service;
pub mod newsletter_service;
pub mod shipping;
#[cfg(test)]
pub mod test_support;

use serde::{Deserialize, Deserializer};

/// `12345` -> `"123.45"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}
