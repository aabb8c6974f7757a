//! Event sinks for pipeline and fulfillment transitions.
//!
//! Sinks are best-effort side channels: a failed emission is logged and
//! swallowed by design, never propagated into the operation that produced
//! the event.

use crate::core::{PipelineStage, PipelineStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// An engine event describing one observable transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Short event type, e.g. "pipeline.advanced" or "pipeline.failed".
    pub event_type: String,
    /// The pipeline the event belongs to.
    pub pipeline_id: Uuid,
    /// The stage the event applies to.
    pub stage: PipelineStage,
    /// The resulting pipeline status.
    pub status: PipelineStatus,
    /// Optional free-form detail (failure reason, cancel reason).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PipelineEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        pipeline_id: Uuid,
        stage: PipelineStage,
        status: PipelineStatus,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            pipeline_id,
            stage,
            status,
            detail: None,
        }
    }

    /// Attaches detail to the event.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Trait for sinks that receive engine events.
///
/// Emission must never fail the caller. Errors are logged and suppressed.
pub trait EventSink: Send + Sync {
    /// Emits an event, best effort.
    fn emit(&self, event: PipelineEvent);
}

/// A no-op sink that discards all events. The default when none is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: PipelineEvent) {
        // Intentionally empty - discards all events
    }
}

/// A sink that logs events through tracing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, event: PipelineEvent) {
        info!(
            event_type = %event.event_type,
            pipeline_id = %event.pipeline_id,
            stage = %event.stage,
            status = %event.status,
            detail = ?event.detail,
            "Event: {}", event.event_type
        );
    }
}

/// A sink that hands events to a background consumer over an unbounded
/// channel.
///
/// This is the fire-and-forget path: if the consumer is gone the send fails,
/// gets logged at debug, and is otherwise dropped.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelEventSink {
    /// Creates a sink and the receiver end for a consumer task.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Creates a sink whose events are drained by a spawned task that logs
    /// them. Useful for local runs where no consumer exists.
    #[must_use]
    pub fn spawn_logging() -> Self {
        let (sink, mut rx) = Self::new();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                LoggingEventSink.emit(event);
            }
        });
        sink
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: PipelineEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!(error = %err, "Event consumer gone, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(event_type: &str) -> PipelineEvent {
        PipelineEvent::new(
            event_type,
            Uuid::new_v4(),
            PipelineStage::Render,
            PipelineStatus::InProgress,
        )
    }

    #[test]
    fn test_noop_sink_discards() {
        NoOpEventSink.emit(event("pipeline.advanced"));
    }

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelEventSink::new();
        sink.emit(event("pipeline.advanced").with_detail("render ok"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, "pipeline.advanced");
        assert_eq!(received.detail.as_deref(), Some("render ok"));
    }

    #[tokio::test]
    async fn test_channel_sink_swallows_closed_receiver() {
        let (sink, rx) = ChannelEventSink::new();
        drop(rx);
        // Must not panic or error.
        sink.emit(event("pipeline.failed"));
    }
}
