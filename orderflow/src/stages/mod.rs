//! Stage handlers: the pluggable units of work executed per pipeline stage.
//!
//! A handler is a pure function of (order, context) to an outcome. Handlers
//! never return `Err`: a broken external call is a [`StageOutcome::Failure`],
//! which the engine turns into a FAILED pipeline and a dead-letter record.

pub mod handlers;
pub mod registry;

pub use handlers::{
    DeliveryHandler, FulfillmentPrepHandler, OpaqueProviderHandler, ShippingHandler,
    ValidationHandler, WorkProvider,
};
pub use registry::HandlerRegistry;

use crate::core::{PipelineStage, QueueName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context handed to a stage handler for one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderContext {
    /// The pipeline driving this attempt.
    pub pipeline_id: Uuid,
    /// The order being processed.
    pub order_id: String,
    /// The stage being executed.
    pub stage: PipelineStage,
    /// Attempt number for this stage (1 on the first run).
    pub attempt: u32,
    /// Opaque order snapshot (items, addresses, design refs).
    pub order: serde_json::Value,
}

/// Outcome of one stage handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage finished its work.
    Success {
        /// Optional human-readable detail.
        detail: Option<String>,
    },
    /// The stage could not finish; the pipeline fails and the attempt is
    /// dead-lettered with this reason.
    Failure {
        /// The failure reason, recorded in pipeline history and on the
        /// failed job.
        reason: String,
    },
}

impl StageOutcome {
    /// A bare success.
    #[must_use]
    pub fn success() -> Self {
        Self::Success { detail: None }
    }

    /// A success with detail.
    #[must_use]
    pub fn success_with(detail: impl Into<String>) -> Self {
        Self::Success {
            detail: Some(detail.into()),
        }
    }

    /// A failure with a reason.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Returns true for success outcomes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Trait for pipeline stage handlers.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// The stage this handler serves.
    fn stage(&self) -> PipelineStage;

    /// Executes one attempt for the given order.
    async fn execute(&self, ctx: &OrderContext) -> StageOutcome;
}

/// The background queue that holds dead-lettered attempts for a stage.
///
/// Validation failures land with the AI-generation workers that produced the
/// content under validation; render failures with the render workers;
/// everything downstream belongs to production processing. The
/// design-generation queue is fed by the design path upstream of render.
#[must_use]
pub fn dead_letter_queue_for(stage: PipelineStage) -> QueueName {
    match stage {
        PipelineStage::Validation => QueueName::AiGeneration,
        PipelineStage::Render => QueueName::RenderProcessing,
        PipelineStage::Production
        | PipelineStage::QualityCheck
        | PipelineStage::Fulfillment
        | PipelineStage::Shipping
        | PipelineStage::Delivery => QueueName::ProductionProcessing,
    }
}
