//! Router configuration.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{bookings, holds};
use axum::routing::{get, post};
use axum::Router;

/// Build the complete Axum router.
///
/// Hold endpoints under `/api/holds`, booking finalization under
/// `/api/events/:event_id/bookings`, health probes at the root.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/holds", post(holds::reserve))
        .route(
            "/holds/:cart_id",
            get(holds::get_cart).delete(holds::clear),
        )
        .route("/holds/:cart_id/release", post(holds::release))
        .route("/events/:event_id/bookings", post(bookings::finalize));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .with_state(state)
}
