//! Axum router construction for the read-back API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use mileage_db::MileageStore;

use crate::handlers;
use crate::state::AppState;

/// Build the complete router over `state`.
///
/// The router includes:
/// - `GET /health` -- liveness
/// - `GET /api/run` -- report of the generation run
/// - `GET /api/mileage/{member_id}` -- account balance record
/// - `GET /api/mileage/{member_id}/history` -- history, `?kind=EARN|USE|EXPIRE`
/// - `GET /api/summaries` -- summaries, `?start=YYYY-MM-DD&end=YYYY-MM-DD`
/// - `GET /api/summaries/{date}` -- one summary
/// - `POST /api/jobs/aggregate` -- run the daily summary job
///
/// CORS allows any origin.
pub fn build_router<S: MileageStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/run", get(handlers::get_run::<S>))
        .route("/api/mileage/{member_id}", get(handlers::get_account::<S>))
        .route(
            "/api/mileage/{member_id}/history",
            get(handlers::get_history::<S>),
        )
        .route("/api/summaries", get(handlers::list_summaries::<S>))
        .route("/api/summaries/{date}", get(handlers::get_summary::<S>))
        .route("/api/jobs/aggregate", post(handlers::run_aggregation::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
