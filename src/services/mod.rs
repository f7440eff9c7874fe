//! The reservation core: hold orchestration and booking finalization.

pub mod booking;
pub mod holds;

pub use booking::{BookingService, FinalizeOutcome};
pub use holds::HoldService;
