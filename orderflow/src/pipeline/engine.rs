//! The pipeline engine: advance, retry, and cancel.
//!
//! Mutation of a single pipeline is serialized through a per-pipeline async
//! mutex, so two concurrent advances can never race into inconsistent stage
//! values. Cancel deliberately bypasses that lock: it must be able to land
//! while a stage handler is in flight. The store's compare-and-swap on
//! [`Pipeline::version`] arbitrates that race: whichever write commits first
//! wins, and the loser re-reads instead of overwriting. A cancelled pipeline
//! therefore stays cancelled no matter when the stage result arrives.

use crate::core::{
    DeadLetterRef, Pipeline, PipelineStatus, StageJob, TransitionOutcome,
};
use crate::errors::{OrderflowError, Result};
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::pipeline::PipelineStore;
use crate::queue::JobQueue;
use crate::stages::{dead_letter_queue_for, HandlerRegistry, OrderContext, StageOutcome};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// How a stage result landed in the store.
enum Commit {
    /// The result was written.
    Applied(Pipeline),
    /// A cancel committed first; the result was discarded and the cancelled
    /// snapshot is returned instead.
    Superseded(Pipeline),
}

/// Sequences stage handlers and owns all pipeline mutation.
pub struct PipelineEngine<P> {
    store: Arc<P>,
    registry: Arc<HandlerRegistry>,
    queue: Arc<dyn JobQueue>,
    sink: Arc<dyn EventSink>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<P: PipelineStore> PipelineEngine<P> {
    /// Creates an engine over a store, handler registry, and queue.
    #[must_use]
    pub fn new(store: Arc<P>, registry: Arc<HandlerRegistry>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            store,
            registry,
            queue,
            sink: Arc::new(NoOpEventSink),
            locks: DashMap::new(),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Creates a pipeline for an order at the validation stage.
    pub async fn create(&self, order_id: &str, order: serde_json::Value) -> Result<Pipeline> {
        let pipeline = Pipeline::new(order_id, order);
        self.store.create(pipeline.clone()).await?;
        info!(pipeline_id = %pipeline.id, order_id, "Created pipeline");
        self.sink.emit(PipelineEvent::new(
            "pipeline.created",
            pipeline.id,
            pipeline.current_stage,
            pipeline.status,
        ));
        Ok(pipeline)
    }

    /// Loads a pipeline snapshot.
    pub async fn get(&self, pipeline_id: Uuid) -> Result<Pipeline> {
        self.store
            .get(pipeline_id)
            .await?
            .ok_or_else(|| OrderflowError::not_found("Pipeline", pipeline_id))
    }

    /// Runs the current stage's handler and, on success, moves the pipeline
    /// one step along the fixed stage graph.
    ///
    /// Handler failure is a valid outcome, not an error: the pipeline
    /// transitions to FAILED, the attempt is dead-lettered for later retry,
    /// and the failed snapshot is returned.
    pub async fn advance(&self, pipeline_id: Uuid) -> Result<Pipeline> {
        let lock = self.stage_lock(pipeline_id);
        let _guard = lock.lock().await;

        let pipeline = self.get(pipeline_id).await?;
        if pipeline.status != PipelineStatus::InProgress {
            return Err(OrderflowError::invalid_transition(
                "Pipeline",
                pipeline.status,
                "advance",
            ));
        }
        self.run_current_stage(pipeline).await
    }

    /// Re-attempts the current stage of a FAILED pipeline.
    ///
    /// Never skips forward: the same stage runs again with an incremented
    /// attempt count, and the dead-letter record from the failed attempt is
    /// cleared.
    pub async fn retry(&self, pipeline_id: Uuid) -> Result<Pipeline> {
        let lock = self.stage_lock(pipeline_id);
        let _guard = lock.lock().await;

        let mut pipeline = self.get(pipeline_id).await?;
        if pipeline.status != PipelineStatus::Failed {
            return Err(OrderflowError::invalid_transition(
                "Pipeline",
                pipeline.status,
                "retry",
            ));
        }

        if let Some(dead_letter) = pipeline.dead_letter.take() {
            if !self
                .queue
                .remove_failed(dead_letter.queue, dead_letter.job_id)
                .await?
            {
                warn!(
                    pipeline_id = %pipeline_id,
                    job_id = %dead_letter.job_id,
                    "Dead-letter record already gone on retry"
                );
            }
        }

        pipeline.status = PipelineStatus::InProgress;
        pipeline.record(pipeline.current_stage, TransitionOutcome::Retried);
        if !self.store.update(&mut pipeline).await? {
            // Only cancel writes outside the stage lock; it won the record.
            let current = self.get(pipeline_id).await?;
            return Err(OrderflowError::invalid_transition(
                "Pipeline",
                current.status,
                "retry",
            ));
        }
        self.sink.emit(PipelineEvent::new(
            "pipeline.retried",
            pipeline.id,
            pipeline.current_stage,
            pipeline.status,
        ));

        self.run_current_stage(pipeline).await
    }

    /// Cancels a pipeline. Legal from any non-terminal status and idempotent:
    /// cancelling an already-cancelled pipeline returns the same snapshot.
    ///
    /// An in-flight stage handler is not interrupted; its result is discarded
    /// when the surrounding advance fails its version check against the
    /// cancelled record.
    pub async fn cancel(&self, pipeline_id: Uuid, reason: &str) -> Result<Pipeline> {
        loop {
            let mut pipeline = self.get(pipeline_id).await?;
            match pipeline.status {
                PipelineStatus::Cancelled => return Ok(pipeline),
                PipelineStatus::Completed => {
                    return Err(OrderflowError::invalid_transition(
                        "Pipeline",
                        pipeline.status,
                        "cancel",
                    ))
                }
                PipelineStatus::InProgress | PipelineStatus::Failed => {}
            }

            pipeline.status = PipelineStatus::Cancelled;
            pipeline.record(
                pipeline.current_stage,
                TransitionOutcome::Cancelled(reason.to_string()),
            );
            // A stage commit may land between the read and the write; re-read
            // and re-apply the cancel on top of it.
            if !self.store.update(&mut pipeline).await? {
                continue;
            }
            info!(pipeline_id = %pipeline_id, reason, "Cancelled pipeline");
            self.sink.emit(
                PipelineEvent::new(
                    "pipeline.cancelled",
                    pipeline.id,
                    pipeline.current_stage,
                    pipeline.status,
                )
                .with_detail(reason),
            );
            return Ok(pipeline);
        }
    }

    /// Commits a stage result, retrying on version conflicts. A conflicting
    /// cancel wins outright: the result is dropped and the cancelled snapshot
    /// returned.
    async fn commit(&self, mut pipeline: Pipeline) -> Result<Commit> {
        loop {
            if self.store.update(&mut pipeline).await? {
                return Ok(Commit::Applied(pipeline));
            }
            let current = self.get(pipeline.id).await?;
            if current.status == PipelineStatus::Cancelled {
                info!(
                    pipeline_id = %pipeline.id,
                    stage = %pipeline.current_stage,
                    "Discarding stage result after cancel"
                );
                return Ok(Commit::Superseded(current));
            }
            pipeline.version = current.version;
        }
    }

    async fn run_current_stage(&self, mut pipeline: Pipeline) -> Result<Pipeline> {
        let stage = pipeline.current_stage;
        let attempt = pipeline.attempts_for(stage) + 1;
        pipeline.attempt_counts.insert(stage, attempt);

        let ctx = OrderContext {
            pipeline_id: pipeline.id,
            order_id: pipeline.order_id.clone(),
            stage,
            attempt,
            order: pipeline.order.clone(),
        };
        let handler = self.registry.handler_for(stage);
        let outcome = handler.execute(&ctx).await;

        match outcome {
            StageOutcome::Success { .. } => {
                match stage.next() {
                    Some(next) => {
                        pipeline.current_stage = next;
                        pipeline.record(stage, TransitionOutcome::Advanced);
                    }
                    None => {
                        pipeline.status = PipelineStatus::Completed;
                        pipeline.record(stage, TransitionOutcome::Completed);
                    }
                }
                match self.commit(pipeline).await? {
                    Commit::Applied(pipeline) => {
                        if pipeline.status == PipelineStatus::Completed {
                            info!(pipeline_id = %pipeline.id, "Pipeline completed");
                            self.sink.emit(PipelineEvent::new(
                                "pipeline.completed",
                                pipeline.id,
                                stage,
                                pipeline.status,
                            ));
                        } else {
                            let next = pipeline.current_stage;
                            info!(pipeline_id = %pipeline.id, from = %stage, to = %next, "Pipeline advanced");
                            self.sink.emit(PipelineEvent::new(
                                "pipeline.advanced",
                                pipeline.id,
                                next,
                                pipeline.status,
                            ));
                        }
                        Ok(pipeline)
                    }
                    Commit::Superseded(current) => Ok(current),
                }
            }
            StageOutcome::Failure { reason } => {
                pipeline.status = PipelineStatus::Failed;
                pipeline.record(stage, TransitionOutcome::Failed(reason.clone()));

                let queue = dead_letter_queue_for(stage);
                let job = StageJob::new(
                    queue,
                    pipeline.id,
                    serde_json::json!({
                        "order_id": pipeline.order_id,
                        "stage": stage.as_str(),
                        "attempt": attempt,
                        "order": pipeline.order,
                    }),
                );
                let record = self.queue.dead_letter(job, &reason).await?;
                let job_id = record.job_id;
                pipeline.dead_letter = Some(DeadLetterRef { queue, job_id });

                match self.commit(pipeline).await? {
                    Commit::Applied(pipeline) => {
                        warn!(
                            pipeline_id = %pipeline.id,
                            stage = %stage,
                            reason = %reason,
                            queue = %queue,
                            "Stage failed, dead-lettered attempt"
                        );
                        self.sink.emit(
                            PipelineEvent::new(
                                "pipeline.failed",
                                pipeline.id,
                                stage,
                                pipeline.status,
                            )
                            .with_detail(reason),
                        );
                        Ok(pipeline)
                    }
                    Commit::Superseded(current) => {
                        // The cancelled record never referenced this dead
                        // letter; drop it rather than strand it.
                        self.queue.remove_failed(queue, job_id).await?;
                        Ok(current)
                    }
                }
            }
        }
    }

    fn stage_lock(&self, pipeline_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(pipeline_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
