//! Error taxonomy for the reservation core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// All user-visible and internal failure modes of the hold and booking
/// services.
///
/// Every variant carries a human-readable message; only [`CoreError::Conflict`]
/// is retryable, and it is retried inside the hold service before being
/// surfaced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed or out-of-range input (quantity, ids).
    #[error("Validation failed: {message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// Event, ticket, or cart absent.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Resource kind ("Event", "Ticket", "Cart").
        resource: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// Cart or event ownership mismatch.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why access was denied.
        message: String,
    },

    /// Event not published, or SKU not active.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Which lifecycle precondition failed.
        message: String,
    },

    /// Current time is outside the SKU's sales window.
    #[error("Ticket sales are closed for this ticket")]
    SalesWindowClosed,

    /// Quantity exceeds the SKU's per-order limit.
    #[error("Quantity exceeds the per-order limit of {limit}")]
    LimitExceeded {
        /// The per-order limit that was exceeded.
        limit: u32,
    },

    /// Requested quantity exceeds derived availability. Terminal, never
    /// retried.
    #[error("Insufficient inventory: {available} available")]
    InsufficientInventory {
        /// Quantity available at the time of the check.
        available: u32,
    },

    /// Optimistic-concurrency contention that survived the retry budget.
    #[error("Concurrent update conflict, please retry")]
    Conflict,

    /// Store-level failure (connection, query, transaction).
    #[error("Store error: {message}")]
    Store {
        /// Sanitized description of the failure.
        message: String,
    },

    /// Cart document could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Sanitized description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Convenience constructor for validation failures.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Convenience constructor for store failures.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// `true` only for contention the caller may safely re-issue.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
