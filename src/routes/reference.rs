//! Reference data routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::reference as r;
use crate::state::AppState;

pub fn reference_routes() -> Router<AppState> {
    Router::new()
        .route("/currencies", get(r::list_currencies).post(r::create_currency))
        .route("/countries", get(r::list_countries).post(r::create_country))
        .route("/districts", get(r::list_districts).post(r::create_district))
        .route("/branches", get(r::list_branches).post(r::create_branch))
        .route("/processes", get(r::list_processes).post(r::create_process))
        .route("/subprocesses", post(r::create_subprocess))
        .route("/subprocesses/:id", get(r::list_subprocesses))
        .route("/departments", post(r::create_department))
        .route("/departments/:id", get(r::list_departments))
        .route(
            "/travelpurpose",
            get(r::list_travel_purposes).post(r::create_travel_purpose),
        )
        .route(
            "/customertypes",
            get(r::list_customer_types).post(r::create_customer_type),
        )
}
