//! Stage jobs and their dead-letter representation.
//!
//! A [`StageJob`] is the unit of work handed to the durable queue for one
//! in-flight stage attempt. When a worker cannot complete it, the job becomes
//! a [`FailedJobRecord`] held for inspection, retry, or removal.

use crate::errors::OrderflowError;
use crate::utils::{generate_uuid, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed set of background queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    /// AI content generation jobs.
    AiGeneration,
    /// Design asset generation jobs.
    DesignGeneration,
    /// Render processing jobs.
    RenderProcessing,
    /// Production and downstream processing jobs.
    ProductionProcessing,
}

impl QueueName {
    /// All known queues.
    pub const ALL: [Self; 4] = [
        Self::AiGeneration,
        Self::DesignGeneration,
        Self::RenderProcessing,
        Self::ProductionProcessing,
    ];

    /// Returns the queue name in wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AiGeneration => "ai-generation",
            Self::DesignGeneration => "design-generation",
            Self::RenderProcessing => "render-processing",
            Self::ProductionProcessing => "production-processing",
        }
    }

    /// Parses a wire-format queue name; unknown names are a `NotFound`.
    pub fn parse(name: &str) -> Result<Self, OrderflowError> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == name)
            .ok_or_else(|| OrderflowError::not_found("Queue", name))
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work handed to the queue for an in-flight stage attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageJob {
    /// The queue this job belongs to.
    pub queue: QueueName,
    /// Unique job identifier.
    pub job_id: Uuid,
    /// The pipeline that created the job.
    pub pipeline_id: Uuid,
    /// Opaque work payload.
    pub payload: serde_json::Value,
    /// When the job was enqueued.
    pub enqueued_at: Timestamp,
}

impl StageJob {
    /// Creates a new job for a pipeline with the given payload.
    #[must_use]
    pub fn new(queue: QueueName, pipeline_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            queue,
            job_id: generate_uuid(),
            pipeline_id,
            payload,
            enqueued_at: now_utc(),
        }
    }
}

/// Dead-letter representation of a job a worker could not complete.
///
/// The original payload is retained so a retry can re-enqueue a fresh
/// [`StageJob`] with the same work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedJobRecord {
    /// The queue the job failed on.
    pub queue: QueueName,
    /// The failed job's identifier.
    pub job_id: Uuid,
    /// The pipeline that created the job.
    pub pipeline_id: Uuid,
    /// Worker-reported failure reason. A job is only "failed" if its
    /// terminal state carried a reason.
    pub failed_reason: String,
    /// When the failure was recorded.
    pub failed_at: Timestamp,
    /// Number of attempts so far, incremented on each retry.
    pub attempts: u32,
    /// The original work payload, kept for re-enqueue.
    pub payload: serde_json::Value,
}

impl FailedJobRecord {
    /// Builds a failed record from a job and a failure reason.
    #[must_use]
    pub fn from_job(job: &StageJob, reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            queue: job.queue,
            job_id: job.job_id,
            pipeline_id: job.pipeline_id,
            failed_reason: reason.into(),
            failed_at: now_utc(),
            attempts,
            payload: job.payload.clone(),
        }
    }

    /// Rebuilds a fresh stage job carrying the same payload, for retry.
    #[must_use]
    pub fn to_retry_job(&self) -> StageJob {
        StageJob {
            queue: self.queue,
            job_id: self.job_id,
            pipeline_id: self.pipeline_id,
            payload: self.payload.clone(),
            enqueued_at: now_utc(),
        }
    }
}
