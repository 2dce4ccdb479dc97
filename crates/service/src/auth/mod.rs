//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, password login, external (Google) sign-in and token
//! issuing live here; email confirmation and password reset build on top
//! of it in `account_service`.

pub mod domain;
pub mod errors;
pub mod jwt;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::AuthService;
