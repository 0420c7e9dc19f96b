//! HTTP middleware: request tracing, rate limiting and the bearer token extractor

pub mod auth;
mod client_ip;
mod rate_limiter;
mod tracing;

pub use auth::AuthenticatedUser;
pub use client_ip::client_ip;
pub use rate_limiter::{rate_limit, RateLimiter};
pub use tracing::request_tracing;
