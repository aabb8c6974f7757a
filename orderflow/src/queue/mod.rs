//! Durable job queue contract.
//!
//! The engine only talks to the queue through this narrow trait; the physical
//! transport of jobs between processes is an external concern. The in-memory
//! implementation in [`memory`] backs tests and local runs.

pub mod memory;

pub use memory::InMemoryJobQueue;

use crate::core::{FailedJobRecord, QueueName, StageJob};
use crate::errors::Result;
use crate::utils::Timestamp;
use async_trait::async_trait;
use uuid::Uuid;

/// Enqueue/dead-letter primitive used by the engine and the dead-letter
/// manager.
///
/// Implementations must support concurrent reads (stats) while writes
/// (cleanup, retry) occur; cleanup deletes by predicate rather than by
/// snapshot.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueues a job for processing.
    ///
    /// At most one non-terminal job may exist per (pipeline, queue); a
    /// duplicate enqueue is a queue error.
    async fn enqueue(&self, job: StageJob) -> Result<()>;

    /// Moves a job to the failed set with the worker-reported reason.
    async fn dead_letter(&self, job: StageJob, reason: &str) -> Result<FailedJobRecord>;

    /// Returns up to `limit` most-recent failed jobs for a queue.
    async fn failed_jobs(&self, queue: QueueName, limit: usize) -> Result<Vec<FailedJobRecord>>;

    /// Looks up a single failed job.
    async fn find_failed(&self, queue: QueueName, job_id: Uuid) -> Result<Option<FailedJobRecord>>;

    /// Looks up a single pending job.
    async fn find_pending(&self, queue: QueueName, job_id: Uuid) -> Result<Option<StageJob>>;

    /// Re-enqueues a failed job with the same payload, increments its attempt
    /// count, and clears the failed record. Returns the fresh job.
    async fn retry_failed(&self, queue: QueueName, job_id: Uuid) -> Result<StageJob>;

    /// Permanently deletes a failed job. Returns true if a record existed.
    async fn remove_failed(&self, queue: QueueName, job_id: Uuid) -> Result<bool>;

    /// Returns the failed-job count and the timestamp of the longest-failed
    /// job still pending retry for a queue.
    async fn failed_stats(&self, queue: QueueName) -> Result<(usize, Option<Timestamp>)>;

    /// Deletes every failed job whose `failed_at` is before `cutoff`.
    /// Returns the number removed.
    async fn cleanup_failed_before(&self, queue: QueueName, cutoff: Timestamp) -> Result<usize>;

    /// Number of pending (non-failed) jobs on a queue.
    async fn pending_len(&self, queue: QueueName) -> Result<usize>;
}
