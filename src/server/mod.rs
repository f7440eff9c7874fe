//! HTTP server assembly: shared state, routes, and health probes.

pub mod health;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
