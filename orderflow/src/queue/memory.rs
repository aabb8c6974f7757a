//! In-memory job queue for tests and local runs.

use crate::core::{FailedJobRecord, QueueName, StageJob};
use crate::errors::{OrderflowError, Result};
use crate::queue::JobQueue;
use crate::utils::Timestamp;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

/// Dashmap-backed queue implementing the [`JobQueue`] contract.
///
/// Pending jobs live in per-queue vectors; failed jobs are indexed by
/// (queue, job id). Cleanup and retry mutate the failed index entry-by-entry
/// so concurrent stats reads never observe a half-applied sweep.
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    pending: DashMap<QueueName, Vec<StageJob>>,
    failed: DashMap<(QueueName, Uuid), FailedJobRecord>,
    attempts: DashMap<Uuid, u32>,
    enqueue_log: Mutex<Vec<StageJob>>,
}

impl InMemoryJobQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every job ever enqueued, in order. Test observability hook.
    #[must_use]
    pub fn enqueued_jobs(&self) -> Vec<StageJob> {
        self.enqueue_log.lock().clone()
    }

    fn has_pending_for_pipeline(&self, queue: QueueName, pipeline_id: Uuid) -> bool {
        self.pending
            .get(&queue)
            .is_some_and(|jobs| jobs.iter().any(|j| j.pipeline_id == pipeline_id))
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: StageJob) -> Result<()> {
        if self.has_pending_for_pipeline(job.queue, job.pipeline_id) {
            return Err(OrderflowError::Queue(format!(
                "pipeline {} already has an active job on {}",
                job.pipeline_id, job.queue
            )));
        }
        self.enqueue_log.lock().push(job.clone());
        self.pending.entry(job.queue).or_default().push(job);
        Ok(())
    }

    async fn dead_letter(&self, job: StageJob, reason: &str) -> Result<FailedJobRecord> {
        // Drop the pending copy if the job was enqueued before it failed.
        if let Some(mut jobs) = self.pending.get_mut(&job.queue) {
            jobs.retain(|j| j.job_id != job.job_id);
        }
        let attempts = self
            .attempts
            .entry(job.job_id)
            .and_modify(|a| *a += 1)
            .or_insert(1);
        let record = FailedJobRecord::from_job(&job, reason, *attempts);
        drop(attempts);
        self.failed.insert((job.queue, job.job_id), record.clone());
        Ok(record)
    }

    async fn failed_jobs(&self, queue: QueueName, limit: usize) -> Result<Vec<FailedJobRecord>> {
        let mut records: Vec<FailedJobRecord> = self
            .failed
            .iter()
            .filter(|e| e.key().0 == queue)
            .map(|e| e.value().clone())
            .collect();
        records.sort_by(|a, b| b.failed_at.cmp(&a.failed_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn find_failed(&self, queue: QueueName, job_id: Uuid) -> Result<Option<FailedJobRecord>> {
        Ok(self.failed.get(&(queue, job_id)).map(|e| e.value().clone()))
    }

    async fn find_pending(&self, queue: QueueName, job_id: Uuid) -> Result<Option<StageJob>> {
        Ok(self
            .pending
            .get(&queue)
            .and_then(|jobs| jobs.iter().find(|j| j.job_id == job_id).cloned()))
    }

    async fn retry_failed(&self, queue: QueueName, job_id: Uuid) -> Result<StageJob> {
        let (_, record) = self
            .failed
            .remove(&(queue, job_id))
            .ok_or_else(|| OrderflowError::not_found("Failed job", job_id))?;
        let job = record.to_retry_job();
        self.enqueue_log.lock().push(job.clone());
        self.pending.entry(queue).or_default().push(job.clone());
        Ok(job)
    }

    async fn remove_failed(&self, queue: QueueName, job_id: Uuid) -> Result<bool> {
        Ok(self.failed.remove(&(queue, job_id)).is_some())
    }

    async fn failed_stats(&self, queue: QueueName) -> Result<(usize, Option<Timestamp>)> {
        let mut count = 0usize;
        let mut oldest: Option<Timestamp> = None;
        for e in self.failed.iter().filter(|e| e.key().0 == queue) {
            count += 1;
            let at = e.value().failed_at;
            oldest = Some(oldest.map_or(at, |o| o.min(at)));
        }
        Ok((count, oldest))
    }

    async fn cleanup_failed_before(&self, queue: QueueName, cutoff: Timestamp) -> Result<usize> {
        let stale: Vec<(QueueName, Uuid)> = self
            .failed
            .iter()
            .filter(|e| e.key().0 == queue && e.value().failed_at < cutoff)
            .map(|e| *e.key())
            .collect();
        let mut removed = 0;
        for key in stale {
            if self.failed.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn pending_len(&self, queue: QueueName) -> Result<usize> {
        Ok(self.pending.get(&queue).map_or(0, |jobs| jobs.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn job(queue: QueueName) -> StageJob {
        StageJob::new(queue, Uuid::new_v4(), serde_json::json!({"k": "v"}))
    }

    #[tokio::test]
    async fn test_enqueue_and_pending_len() {
        let q = InMemoryJobQueue::new();
        q.enqueue(job(QueueName::AiGeneration)).await.unwrap();
        q.enqueue(job(QueueName::AiGeneration)).await.unwrap();
        assert_eq!(q.pending_len(QueueName::AiGeneration).await.unwrap(), 2);
        assert_eq!(q.pending_len(QueueName::RenderProcessing).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_pipeline_job_rejected() {
        let q = InMemoryJobQueue::new();
        let pipeline_id = Uuid::new_v4();
        let a = StageJob::new(QueueName::RenderProcessing, pipeline_id, serde_json::json!({}));
        let b = StageJob::new(QueueName::RenderProcessing, pipeline_id, serde_json::json!({}));
        q.enqueue(a).await.unwrap();
        let err = q.enqueue(b).await.unwrap_err();
        assert!(matches!(err, OrderflowError::Queue(_)));
    }

    #[tokio::test]
    async fn test_dead_letter_moves_job_out_of_pending() {
        let q = InMemoryJobQueue::new();
        let j = job(QueueName::RenderProcessing);
        q.enqueue(j.clone()).await.unwrap();
        let record = q.dead_letter(j, "worker crashed").await.unwrap();
        assert_eq!(record.attempts, 1);
        assert_eq!(q.pending_len(QueueName::RenderProcessing).await.unwrap(), 0);
        let failed = q.failed_jobs(QueueName::RenderProcessing, 50).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].failed_reason, "worker crashed");
    }

    #[tokio::test]
    async fn test_retry_failed_reenqueues_and_clears() {
        let q = InMemoryJobQueue::new();
        let j = job(QueueName::ProductionProcessing);
        let job_id = j.job_id;
        q.dead_letter(j, "oops").await.unwrap();

        let retried = q
            .retry_failed(QueueName::ProductionProcessing, job_id)
            .await
            .unwrap();
        assert_eq!(retried.job_id, job_id);
        assert!(q
            .find_failed(QueueName::ProductionProcessing, job_id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            q.pending_len(QueueName::ProductionProcessing).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_retry_increments_attempts_on_next_failure() {
        let q = InMemoryJobQueue::new();
        let j = job(QueueName::ProductionProcessing);
        let job_id = j.job_id;
        q.dead_letter(j, "first").await.unwrap();
        let retried = q
            .retry_failed(QueueName::ProductionProcessing, job_id)
            .await
            .unwrap();
        let record = q.dead_letter(retried, "second").await.unwrap();
        assert_eq!(record.attempts, 2);
    }

    #[tokio::test]
    async fn test_find_pending() {
        let q = InMemoryJobQueue::new();
        let j = job(QueueName::AiGeneration);
        let job_id = j.job_id;
        q.enqueue(j).await.unwrap();

        let found = q.find_pending(QueueName::AiGeneration, job_id).await.unwrap();
        assert_eq!(found.unwrap().job_id, job_id);
        assert!(q
            .find_pending(QueueName::AiGeneration, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_retry_missing_job_is_not_found() {
        let q = InMemoryJobQueue::new();
        let err = q
            .retry_failed(QueueName::AiGeneration, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_stats_tracks_oldest() {
        let q = InMemoryJobQueue::new();
        let (count, oldest) = q.failed_stats(QueueName::AiGeneration).await.unwrap();
        assert_eq!(count, 0);
        assert!(oldest.is_none());

        q.dead_letter(job(QueueName::AiGeneration), "a").await.unwrap();
        q.dead_letter(job(QueueName::AiGeneration), "b").await.unwrap();
        let (count, oldest) = q.failed_stats(QueueName::AiGeneration).await.unwrap();
        assert_eq!(count, 2);
        assert!(oldest.is_some());
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_stale_jobs() {
        let q = InMemoryJobQueue::new();
        let stale = job(QueueName::RenderProcessing);
        let fresh = job(QueueName::RenderProcessing);
        let stale_id = stale.job_id;
        q.dead_letter(stale, "old").await.unwrap();
        // Backdate the stale record past the cutoff.
        if let Some(mut e) = q.failed.get_mut(&(QueueName::RenderProcessing, stale_id)) {
            e.failed_at = crate::utils::days_ago(40);
        }
        q.dead_letter(fresh, "new").await.unwrap();

        let removed = q
            .cleanup_failed_before(QueueName::RenderProcessing, crate::utils::days_ago(30))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let remaining = q.failed_jobs(QueueName::RenderProcessing, 50).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].failed_reason, "new");

        // Second sweep removes nothing.
        let removed = q
            .cleanup_failed_before(QueueName::RenderProcessing, crate::utils::days_ago(30))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_failed_jobs_most_recent_first_and_limited() {
        let q = InMemoryJobQueue::new();
        for i in 0..5i64 {
            let j = job(QueueName::AiGeneration);
            let id = j.job_id;
            q.dead_letter(j, &format!("r{i}")).await.unwrap();
            // Spread failed_at so ordering is deterministic.
            if let Some(mut e) = q.failed.get_mut(&(QueueName::AiGeneration, id)) {
                e.failed_at = crate::utils::days_ago(5 - i);
            }
        }
        let failed = q.failed_jobs(QueueName::AiGeneration, 3).await.unwrap();
        assert_eq!(failed.len(), 3);
        assert!(failed[0].failed_at >= failed[1].failed_at);
        assert!(failed[1].failed_at >= failed[2].failed_at);
    }
}
