//! Request lifecycle routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::requests;
use crate::state::AppState;

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/request", post(requests::create_request))
        .route("/requests", get(requests::list_requests))
        .route("/request/:id", get(requests::get_request))
        .route("/validaterequest/:id", post(requests::validate_request))
        .route("/approverequest/:id", post(requests::approve_request))
        .route("/rejectrequest/:id", post(requests::reject_request))
        .route("/acceptrequest/:id", post(requests::accept_request))
        .route("/declinerequest/:id", post(requests::decline_request))
}
