//! Shared building blocks for the shop crates: the response envelope,
//! pagination parameters, env helpers and logging setup.

pub mod env;
pub mod pagination;
pub mod types;
pub mod utils;
