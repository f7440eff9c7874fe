//! HTTP contract exposed to the routing layer.
//!
//! Handlers translate JSON requests into service calls and typed errors
//! into HTTP responses; no business rule lives here.

pub mod bookings;
pub mod error;
pub mod holds;

pub use error::ApiError;
