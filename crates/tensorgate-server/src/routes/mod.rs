//! HTTP route handlers.

pub mod auth;
pub mod health;
pub mod proxy;

pub use health::health_routes;
