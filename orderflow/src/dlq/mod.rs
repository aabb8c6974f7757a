//! Dead-letter management: inspect, retry, remove, and purge failed jobs.
//!
//! Operates per queue name from the fixed set; unknown names fail with
//! `NotFound`. The manager owns no storage of its own, it drives the
//! [`JobQueue`](crate::queue::JobQueue) contract.

use crate::config::EngineConfig;
use crate::core::{FailedJobRecord, QueueName, StageJob};
use crate::errors::{OrderflowError, Result};
use crate::queue::JobQueue;
use crate::utils::{days_ago, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Per-queue failure statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFailureStats {
    /// Number of failed jobs pending retry.
    pub count: usize,
    /// Timestamp of the longest-failed job, `None` when the queue is clean.
    pub oldest: Option<Timestamp>,
}

/// Inspects, retries, removes, and purges failed jobs per queue.
pub struct DeadLetterManager {
    queue: Arc<dyn JobQueue>,
    default_limit: usize,
    retention_days: i64,
}

impl DeadLetterManager {
    /// Creates a manager over a queue with defaults from the engine config.
    #[must_use]
    pub fn new(queue: Arc<dyn JobQueue>, config: &EngineConfig) -> Self {
        Self {
            queue,
            default_limit: config.dlq_default_limit,
            retention_days: config.dlq_retention_days,
        }
    }

    /// Returns up to `limit` most-recent failed jobs for a queue
    /// (`default_limit` when `None`).
    pub async fn failed_jobs(
        &self,
        queue_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<FailedJobRecord>> {
        let queue = QueueName::parse(queue_name)?;
        self.queue
            .failed_jobs(queue, limit.unwrap_or(self.default_limit))
            .await
    }

    /// Returns `{count, oldest}` for every known queue.
    pub async fn failed_stats(&self) -> Result<HashMap<QueueName, QueueFailureStats>> {
        let mut stats = HashMap::new();
        for queue in QueueName::ALL {
            let (count, oldest) = self.queue.failed_stats(queue).await?;
            stats.insert(queue, QueueFailureStats { count, oldest });
        }
        Ok(stats)
    }

    /// Re-enqueues a failed job and clears its failed record.
    ///
    /// Fails with `InvalidStateTransition` if the job is already back in the
    /// pending queue (picked up by an earlier retry), and with `NotFound` if
    /// the queue has no trace of it at all.
    pub async fn retry_job(&self, queue_name: &str, job_id: Uuid) -> Result<StageJob> {
        let queue = QueueName::parse(queue_name)?;
        if self.queue.find_failed(queue, job_id).await?.is_some() {
            let job = self.queue.retry_failed(queue, job_id).await?;
            info!(queue = %queue, job_id = %job_id, "Re-enqueued failed job");
            return Ok(job);
        }
        if self.queue.find_pending(queue, job_id).await?.is_some() {
            return Err(OrderflowError::invalid_transition(
                "Job", "pending", "retry",
            ));
        }
        Err(OrderflowError::not_found("Failed job", job_id))
    }

    /// Permanently deletes a failed job.
    pub async fn remove_job(&self, queue_name: &str, job_id: Uuid) -> Result<()> {
        let queue = QueueName::parse(queue_name)?;
        if self.queue.remove_failed(queue, job_id).await? {
            debug!(queue = %queue, job_id = %job_id, "Removed failed job");
            Ok(())
        } else {
            Err(OrderflowError::not_found("Failed job", job_id))
        }
    }

    /// Deletes every failed job older than `older_than_days` (the configured
    /// retention when `None`). Returns the count removed.
    ///
    /// Safe to run concurrently with new failures arriving: only jobs that
    /// existed at scan time are considered.
    pub async fn cleanup_old_failed_jobs(
        &self,
        queue_name: &str,
        older_than_days: Option<i64>,
    ) -> Result<usize> {
        let queue = QueueName::parse(queue_name)?;
        let cutoff = days_ago(older_than_days.unwrap_or(self.retention_days));
        let removed = self.queue.cleanup_failed_before(queue, cutoff).await?;
        info!(queue = %queue, removed, "Cleaned up old failed jobs");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageJob;
    use crate::queue::InMemoryJobQueue;
    use pretty_assertions::assert_eq;

    fn manager() -> (Arc<InMemoryJobQueue>, DeadLetterManager) {
        let queue = Arc::new(InMemoryJobQueue::new());
        let manager = DeadLetterManager::new(queue.clone(), &EngineConfig::default());
        (queue, manager)
    }

    fn job(queue: QueueName) -> StageJob {
        StageJob::new(queue, Uuid::new_v4(), serde_json::json!({"work": true}))
    }

    #[tokio::test]
    async fn test_unknown_queue_name_is_not_found() {
        let (_, dlq) = manager();
        let err = dlq.failed_jobs("no-such-queue", None).await.unwrap_err();
        assert!(err.is_not_found());

        let err = dlq
            .retry_job("no-such-queue", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_jobs_empty_by_default() {
        let (_, dlq) = manager();
        let jobs = dlq.failed_jobs("ai-generation", None).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_failed_stats_covers_all_queues() {
        let (queue, dlq) = manager();
        queue
            .dead_letter(job(QueueName::RenderProcessing), "boom")
            .await
            .unwrap();

        let stats = dlq.failed_stats().await.unwrap();
        assert_eq!(stats.len(), QueueName::ALL.len());
        assert_eq!(stats[&QueueName::RenderProcessing].count, 1);
        assert!(stats[&QueueName::RenderProcessing].oldest.is_some());
        assert_eq!(stats[&QueueName::AiGeneration].count, 0);
        assert!(stats[&QueueName::AiGeneration].oldest.is_none());
    }

    #[tokio::test]
    async fn test_retry_job_reenqueues_and_clears_record() {
        let (queue, dlq) = manager();
        let j = job(QueueName::ProductionProcessing);
        let job_id = j.job_id;
        queue.dead_letter(j, "worker died").await.unwrap();

        let retried = dlq.retry_job("production-processing", job_id).await.unwrap();
        assert_eq!(retried.job_id, job_id);
        assert!(dlq
            .failed_jobs("production-processing", None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_retry_of_already_pending_job_is_invalid_transition() {
        let (queue, dlq) = manager();
        let j = job(QueueName::ProductionProcessing);
        let job_id = j.job_id;
        queue.dead_letter(j, "worker died").await.unwrap();

        dlq.retry_job("production-processing", job_id).await.unwrap();
        let err = dlq
            .retry_job("production-processing", job_id)
            .await
            .unwrap_err();
        assert!(err.is_invalid_transition());
    }

    #[tokio::test]
    async fn test_empty_reason_does_not_block_retry() {
        let (queue, dlq) = manager();
        let j = job(QueueName::RenderProcessing);
        let job_id = j.job_id;
        queue.dead_letter(j, "").await.unwrap();

        let retried = dlq.retry_job("render-processing", job_id).await.unwrap();
        assert_eq!(retried.job_id, job_id);
    }

    #[tokio::test]
    async fn test_retry_missing_job_is_not_found() {
        let (_, dlq) = manager();
        let err = dlq
            .retry_job("ai-generation", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_job() {
        let (queue, dlq) = manager();
        let j = job(QueueName::AiGeneration);
        let job_id = j.job_id;
        queue.dead_letter(j, "boom").await.unwrap();

        dlq.remove_job("ai-generation", job_id).await.unwrap();
        let err = dlq.remove_job("ai-generation", job_id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let (queue, dlq) = manager();
        let j = job(QueueName::DesignGeneration);
        queue.dead_letter(j, "stale").await.unwrap();

        // A fresh failure is inside the retention window.
        assert_eq!(
            dlq.cleanup_old_failed_jobs("design-generation", Some(30))
                .await
                .unwrap(),
            0
        );

        // Everything is older than a zero-day window.
        assert_eq!(
            dlq.cleanup_old_failed_jobs("design-generation", Some(-1))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            dlq.cleanup_old_failed_jobs("design-generation", Some(-1))
                .await
                .unwrap(),
            0
        );
    }
}
