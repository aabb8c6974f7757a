//! The service facade: one struct exposing the whole operation surface.
//!
//! Wired with explicit constructor injection; HTTP framing stays external and
//! maps onto these methods one-to-one.

use crate::core::{
    Address, AddressValidation, BookingResult, BrandRate, Fulfillment, Pipeline, RateRequest,
    ShipmentRequest, StageJob,
};
use crate::core::{FailedJobRecord, QueueName};
use crate::dlq::{DeadLetterManager, QueueFailureStats};
use crate::errors::Result;
use crate::fulfillment::{FulfillmentStore, FulfillmentTracker};
use crate::pipeline::{PipelineEngine, PipelineStore};
use crate::shipping::{RateQuoteResponse, ShippingGateway};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Aggregates the engine, dead-letter manager, shipping gateway, and
/// fulfillment tracker behind a single call surface.
pub struct OrderflowService<P: PipelineStore, S: FulfillmentStore> {
    engine: Arc<PipelineEngine<P>>,
    dlq: DeadLetterManager,
    gateway: Arc<ShippingGateway>,
    tracker: Arc<FulfillmentTracker<S>>,
}

impl<P: PipelineStore, S: FulfillmentStore> OrderflowService<P, S> {
    /// Assembles the service from its collaborators.
    #[must_use]
    pub fn new(
        engine: Arc<PipelineEngine<P>>,
        dlq: DeadLetterManager,
        gateway: Arc<ShippingGateway>,
        tracker: Arc<FulfillmentTracker<S>>,
    ) -> Self {
        Self {
            engine,
            dlq,
            gateway,
            tracker,
        }
    }

    // Pipelines.

    /// Creates a pipeline for an order.
    pub async fn create_pipeline(
        &self,
        order_id: &str,
        order: serde_json::Value,
    ) -> Result<Pipeline> {
        self.engine.create(order_id, order).await
    }

    /// Returns the pipeline snapshot.
    pub async fn get_pipeline(&self, pipeline_id: Uuid) -> Result<Pipeline> {
        self.engine.get(pipeline_id).await
    }

    /// Runs the current stage and advances on success.
    pub async fn advance_pipeline(&self, pipeline_id: Uuid) -> Result<Pipeline> {
        self.engine.advance(pipeline_id).await
    }

    /// Re-attempts the current stage of a failed pipeline.
    pub async fn retry_pipeline(&self, pipeline_id: Uuid) -> Result<Pipeline> {
        self.engine.retry(pipeline_id).await
    }

    /// Cancels a pipeline.
    pub async fn cancel_pipeline(&self, pipeline_id: Uuid, reason: &str) -> Result<Pipeline> {
        self.engine.cancel(pipeline_id, reason).await
    }

    // Dead-letter queues.

    /// Most-recent failed jobs for a queue.
    pub async fn failed_jobs(
        &self,
        queue_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<FailedJobRecord>> {
        self.dlq.failed_jobs(queue_name, limit).await
    }

    /// Failure stats for every known queue.
    pub async fn failed_stats(&self) -> Result<HashMap<QueueName, QueueFailureStats>> {
        self.dlq.failed_stats().await
    }

    /// Re-enqueues a failed job.
    pub async fn retry_job(&self, queue_name: &str, job_id: Uuid) -> Result<StageJob> {
        self.dlq.retry_job(queue_name, job_id).await
    }

    /// Permanently deletes a failed job.
    pub async fn remove_job(&self, queue_name: &str, job_id: Uuid) -> Result<()> {
        self.dlq.remove_job(queue_name, job_id).await
    }

    /// Purges failed jobs older than the cutoff, returning the count removed.
    pub async fn cleanup_old_failed_jobs(
        &self,
        queue_name: &str,
        older_than_days: Option<i64>,
    ) -> Result<usize> {
        self.dlq
            .cleanup_old_failed_jobs(queue_name, older_than_days)
            .await
    }

    // Shipping.

    /// Quotes rates across registered carriers.
    pub async fn get_rates(&self, request: &RateRequest) -> Result<RateQuoteResponse> {
        self.gateway.get_rates(request).await
    }

    /// Books a shipment against a quoted rate.
    pub async fn create_shipment(&self, request: &ShipmentRequest) -> Result<BookingResult> {
        self.gateway.create_shipment(request).await
    }

    /// Advisory address validation.
    pub async fn validate_address(&self, address: &Address) -> Result<AddressValidation> {
        self.gateway.validate_address(address).await
    }

    /// Registered carrier identifiers, de-duplicated.
    #[must_use]
    pub fn get_carriers(&self) -> Vec<String> {
        self.gateway.get_carriers()
    }

    /// Active static rates configured for a brand.
    #[must_use]
    pub fn get_brand_rates(&self, brand_id: &str) -> Vec<BrandRate> {
        self.gateway.get_brand_rates(brand_id)
    }

    /// Fetches the label URL for a booked shipment.
    pub async fn get_label(&self, carrier: &str, shipment_id: &str) -> Result<String> {
        self.gateway.get_label(carrier, shipment_id).await
    }

    /// Cancels a booked shipment with its carrier.
    pub async fn cancel_shipment(&self, carrier: &str, shipment_id: &str) -> Result<()> {
        self.gateway.cancel_shipment(carrier, shipment_id).await
    }

    // Fulfillments.

    /// Returns the fulfillment snapshot.
    pub async fn get_fulfillment(&self, id: Uuid) -> Result<Fulfillment> {
        self.tracker.get(id).await
    }

    /// Marks a fulfillment shipped.
    pub async fn ship_fulfillment(&self, id: Uuid) -> Result<Fulfillment> {
        self.tracker.ship(id).await
    }

    /// Marks a fulfillment delivered.
    pub async fn deliver_fulfillment(&self, id: Uuid) -> Result<Fulfillment> {
        self.tracker.deliver(id).await
    }

    /// Cancels a pre-shipment fulfillment.
    pub async fn cancel_fulfillment(&self, id: Uuid) -> Result<Fulfillment> {
        self.tracker.cancel(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::PipelineStage;
    use crate::fulfillment::InMemoryFulfillmentStore;
    use crate::pipeline::InMemoryPipelineStore;
    use crate::queue::InMemoryJobQueue;
    use crate::stages::HandlerRegistry;
    use crate::testing::fixtures;
    use crate::testing::mocks::{MockShippingProvider, MockStageHandler};
    use pretty_assertions::assert_eq;

    fn service() -> OrderflowService<InMemoryPipelineStore, InMemoryFulfillmentStore> {
        let config = EngineConfig::default();
        let queue = Arc::new(InMemoryJobQueue::new());
        let mut builder = HandlerRegistry::builder();
        for stage in PipelineStage::ALL {
            builder = builder.with_handler(Arc::new(MockStageHandler::new(stage)));
        }
        let engine = Arc::new(PipelineEngine::new(
            Arc::new(InMemoryPipelineStore::new()),
            Arc::new(builder.build().unwrap()),
            queue.clone(),
        ));
        let gateway = Arc::new(ShippingGateway::new(
            vec![Arc::new(
                MockShippingProvider::new("fastship").with_rate("express", 1500, 1, 2),
            )],
            &config,
        ));
        let tracker = Arc::new(FulfillmentTracker::new(InMemoryFulfillmentStore::new()));
        OrderflowService::new(
            engine,
            DeadLetterManager::new(queue, &config),
            gateway,
            tracker,
        )
    }

    #[tokio::test]
    async fn test_pipeline_surface_round_trip() {
        let svc = service();
        let p = svc
            .create_pipeline("order-1", fixtures::order())
            .await
            .unwrap();
        let advanced = svc.advance_pipeline(p.id).await.unwrap();
        assert_eq!(advanced.current_stage, PipelineStage::Render);
        assert_eq!(svc.get_pipeline(p.id).await.unwrap().history.len(), 1);
    }

    #[tokio::test]
    async fn test_shipping_surface_delegates() {
        let svc = service();
        let quote = svc.get_rates(&fixtures::rate_request(None)).await.unwrap();
        assert_eq!(quote.rates.len(), 1);
        assert_eq!(svc.get_carriers(), vec!["fastship"]);

        let booking = svc
            .create_shipment(&fixtures::shipment_request("fastship_express"))
            .await
            .unwrap();
        assert_eq!(booking.carrier, "fastship");
    }

    #[tokio::test]
    async fn test_dlq_surface_validates_queue_names() {
        let svc = service();
        assert!(svc
            .failed_jobs("no-such-queue", None)
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(svc.failed_stats().await.unwrap().len(), QueueName::ALL.len());
    }
}
