use axum::{routing::get, Router};

use crate::handlers::profile;
use crate::state::AppState;

pub fn profile_routes() -> Router<AppState> {
    Router::new().route(
        "/profile/:id",
        get(profile::get_profile).put(profile::update_profile),
    )
}
