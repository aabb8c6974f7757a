//! Pipeline record and stage graph.
//!
//! A [`Pipeline`] tracks one order's journey through the fixed production
//! stage sequence. It is owned exclusively by the pipeline engine and mutated
//! only through advance/retry/cancel; once its status is terminal the record
//! is retained for audit and never mutated again.

use crate::utils::{generate_uuid, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The fixed production stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    /// Order and design validation.
    Validation,
    /// Asset rendering.
    Render,
    /// Physical production.
    Production,
    /// Post-production quality check.
    QualityCheck,
    /// Fulfillment preparation (pick/pack record creation).
    Fulfillment,
    /// Carrier booking and dispatch.
    Shipping,
    /// Final-mile delivery confirmation.
    Delivery,
}

impl PipelineStage {
    /// All stages in execution order.
    pub const ALL: [Self; 7] = [
        Self::Validation,
        Self::Render,
        Self::Production,
        Self::QualityCheck,
        Self::Fulfillment,
        Self::Shipping,
        Self::Delivery,
    ];

    /// Returns the next stage in the fixed graph, or `None` after
    /// [`PipelineStage::Delivery`] (the pipeline completes).
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let idx = self.index();
        Self::ALL.get(idx + 1).copied()
    }

    /// Returns the zero-based index of this stage in the fixed graph.
    #[must_use]
    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// Returns the stage name in wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::Render => "RENDER",
            Self::Production => "PRODUCTION",
            Self::QualityCheck => "QUALITY_CHECK",
            Self::Fulfillment => "FULFILLMENT",
            Self::Shipping => "SHIPPING",
            Self::Delivery => "DELIVERY",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    /// Actively moving through stages.
    InProgress,
    /// All stages finished successfully.
    Completed,
    /// The current stage's handler failed; retryable.
    Failed,
    /// Cancelled by an operator or caller.
    Cancelled,
}

impl PipelineStatus {
    /// Returns true for `Completed` and `Cancelled`, the states from which no
    /// further mutation is allowed. `Failed` is not terminal: it admits
    /// `retry` and `cancel`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns the status name in wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome recorded for one stage transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The stage handler succeeded and the pipeline advanced.
    Advanced,
    /// The stage handler failed with the given reason.
    Failed(String),
    /// The stage is being re-attempted after a failure.
    Retried,
    /// The pipeline was cancelled with the given reason.
    Cancelled(String),
    /// The final stage completed and the pipeline finished.
    Completed,
}

/// One entry in a pipeline's ordered transition history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    /// The stage the transition applies to.
    pub stage: PipelineStage,
    /// What happened.
    pub outcome: TransitionOutcome,
    /// When it happened.
    pub at: Timestamp,
}

/// One order's journey through the production stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Unique pipeline identifier.
    pub id: Uuid,
    /// The order this pipeline belongs to.
    pub order_id: String,
    /// Opaque order snapshot handed to stage handlers (items, addresses,
    /// design refs).
    pub order: serde_json::Value,
    /// The stage the pipeline is currently at.
    pub current_stage: PipelineStage,
    /// Lifecycle status.
    pub status: PipelineStatus,
    /// Per-stage attempt counts. A stage appears once it has run at least
    /// once; retry increments the entry for the current stage.
    pub attempt_counts: HashMap<PipelineStage, u32>,
    /// Last mutation time.
    pub updated_at: Timestamp,
    /// Ordered log of stage transitions.
    pub history: Vec<StageTransition>,
    /// The dead-letter record created by the most recent stage failure, if
    /// any. Cleared by `retry`.
    pub dead_letter: Option<DeadLetterRef>,
    /// Optimistic-concurrency version, bumped by the store on every committed
    /// update. A writer holding a stale version cannot overwrite a newer
    /// record.
    pub version: u64,
}

/// Reference to a dead-letter record created for a failed stage attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterRef {
    /// The queue holding the failed job.
    pub queue: super::job::QueueName,
    /// The failed job's identifier.
    pub job_id: Uuid,
}

impl Pipeline {
    /// Creates a new pipeline for an order, starting at validation.
    #[must_use]
    pub fn new(order_id: impl Into<String>, order: serde_json::Value) -> Self {
        Self {
            id: generate_uuid(),
            order_id: order_id.into(),
            order,
            current_stage: PipelineStage::Validation,
            status: PipelineStatus::InProgress,
            attempt_counts: HashMap::new(),
            updated_at: now_utc(),
            history: Vec::new(),
            dead_letter: None,
            version: 0,
        }
    }

    /// Progress through the stage graph as a percentage, derived from the
    /// current stage index. A completed pipeline reports 100.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        if self.status == PipelineStatus::Completed {
            return 100;
        }
        let total = PipelineStage::ALL.len();
        let done = self.current_stage.index();
        u8::try_from(done * 100 / total).unwrap_or(100)
    }

    /// Attempt count for the given stage (0 if the stage has not run).
    #[must_use]
    pub fn attempts_for(&self, stage: PipelineStage) -> u32 {
        self.attempt_counts.get(&stage).copied().unwrap_or(0)
    }

    /// Records a transition in the history and bumps `updated_at`.
    pub fn record(&mut self, stage: PipelineStage, outcome: TransitionOutcome) {
        let at = now_utc();
        self.history.push(StageTransition { stage, outcome, at });
        self.updated_at = at;
    }
}
