//! v1 API endpoints

pub mod experiments;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create the v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/experiments",
            get(experiments::list_experiments).post(experiments::create_experiment),
        )
        .route(
            "/experiments/{id}",
            get(experiments::get_experiment).delete(experiments::delete_experiment),
        )
        .route("/experiments/{id}/actions", post(experiments::apply_action))
        .route("/experiments/{id}/events", post(experiments::record_event))
        .route(
            "/experiments/{id}/allocations",
            get(experiments::get_allocations),
        )
        .route(
            "/experiments/{id}/variants/{variant_id}/reset",
            post(experiments::reset_variant_metrics),
        )
}
