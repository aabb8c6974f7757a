//! Error types for the orderflow engine.
//!
//! The taxonomy follows the failure-as-data philosophy of the engine: a stage
//! handler failing is a valid pipeline outcome and is never represented here.
//! These errors cover malformed requests, unknown identifiers, illegal state
//! transitions, and infrastructure faults.

use thiserror::Error;

/// The main error type for orderflow operations.
#[derive(Debug, Error)]
pub enum OrderflowError {
    /// A request was malformed and rejected before any state change.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A pipeline, job, rate, or fulfillment could not be found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        kind: String,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// The requested operation is illegal for the entity's current state.
    #[error("Invalid state transition for {entity}: {from} -> {attempted}")]
    InvalidStateTransition {
        /// The entity being mutated.
        entity: String,
        /// The current state.
        from: String,
        /// The attempted operation or target state.
        attempted: String,
    },

    /// A single carrier adapter failed. Isolated and logged during rate
    /// aggregation; only surfaced when a specific provider was requested.
    #[error("Provider '{carrier}' failed: {reason}")]
    Provider {
        /// The carrier identity of the failing provider.
        carrier: String,
        /// The failure reason reported by the adapter.
        reason: String,
    },

    /// An enqueue/dequeue operation against the durable queue failed.
    #[error("Queue error: {0}")]
    Queue(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrderflowError {
    /// Creates a not-found error for an entity kind and id.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Creates an invalid-state-transition error.
    #[must_use]
    pub fn invalid_transition(
        entity: impl Into<String>,
        from: impl std::fmt::Display,
        attempted: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidStateTransition {
            entity: entity.into(),
            from: from.to_string(),
            attempted: attempted.to_string(),
        }
    }

    /// Creates a provider error.
    #[must_use]
    pub fn provider(carrier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provider {
            carrier: carrier.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is an invalid-state-transition error.
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidStateTransition { .. })
    }
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OrderflowError>;
