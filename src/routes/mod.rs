//! Route definitions and router assembly

mod auth;
mod profile;
mod reference;
mod requests;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::handlers::health;
use crate::middleware::{self, RateLimiter};
use crate::state::AppState;

pub use auth::auth_routes;
pub use profile::profile_routes;
pub use reference::reference_routes;
pub use requests::request_routes;

/// The full application: routes, attachment serving and middleware stack
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    let rate_limiter = RateLimiter::new(config.rate_limit_rps, config.trust_proxy_headers);
    rate_limiter.spawn_sweeper();

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .merge(auth_routes())
        .merge(request_routes())
        .merge(reference_routes())
        .merge(profile_routes())
        .nest_service("/files", ServeDir::new(&config.upload_dir))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(configure_cors(config.cors_allowed_origins.as_deref()))
                .layer(axum::middleware::from_fn_with_state(
                    rate_limiter,
                    middleware::rate_limit,
                ))
                .layer(axum::middleware::from_fn(middleware::request_tracing))
                .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
