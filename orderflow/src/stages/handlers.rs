//! Default handlers for the seven production stages.

use crate::core::{Address, Package, PipelineStage};
use crate::fulfillment::{FulfillmentStore, FulfillmentTracker};
use crate::shipping::ShippingGateway;
use crate::stages::{OrderContext, StageHandler, StageOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Opaque success/failure source backing the render, production, and
/// quality-check stages. AI and production providers are external
/// collaborators; the engine only sees their verdict.
#[async_trait]
pub trait WorkProvider: Send + Sync {
    /// Performs the stage's work, reporting failure as a reason string.
    async fn perform(&self, ctx: &OrderContext) -> Result<(), String>;
}

/// A provider that always completes. Default wiring for stages whose real
/// work happens in external workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysCompleteProvider;

#[async_trait]
impl WorkProvider for AlwaysCompleteProvider {
    async fn perform(&self, _ctx: &OrderContext) -> Result<(), String> {
        Ok(())
    }
}

/// Validates the order snapshot before production starts.
///
/// Rejects orders with no items or an unparsable shipping address; a
/// malformed order fails the stage rather than erroring the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationHandler;

#[async_trait]
impl StageHandler for ValidationHandler {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Validation
    }

    async fn execute(&self, ctx: &OrderContext) -> StageOutcome {
        let items = ctx.order.get("items").and_then(|v| v.as_array());
        match items {
            None => return StageOutcome::failure("order has no items field"),
            Some(items) if items.is_empty() => {
                return StageOutcome::failure("order has no items");
            }
            Some(_) => {}
        }

        match ctx.order.get("shipping_address") {
            None => StageOutcome::failure("order has no shipping address"),
            Some(value) => match serde_json::from_value::<Address>(value.clone()) {
                Ok(_) => StageOutcome::success(),
                Err(err) => StageOutcome::failure(format!("invalid shipping address: {err}")),
            },
        }
    }
}

/// Wraps an opaque [`WorkProvider`] for a single stage.
pub struct OpaqueProviderHandler {
    stage: PipelineStage,
    provider: Arc<dyn WorkProvider>,
}

impl OpaqueProviderHandler {
    /// Creates a handler for a stage over a provider.
    #[must_use]
    pub fn new(stage: PipelineStage, provider: Arc<dyn WorkProvider>) -> Self {
        Self { stage, provider }
    }
}

#[async_trait]
impl StageHandler for OpaqueProviderHandler {
    fn stage(&self) -> PipelineStage {
        self.stage
    }

    async fn execute(&self, ctx: &OrderContext) -> StageOutcome {
        match self.provider.perform(ctx).await {
            Ok(()) => StageOutcome::success(),
            Err(reason) => StageOutcome::failure(reason),
        }
    }
}

/// Creates the fulfillment record when the pipeline reaches fulfillment
/// preparation. Idempotent on retry: an existing record is a success.
pub struct FulfillmentPrepHandler<S: FulfillmentStore> {
    tracker: Arc<FulfillmentTracker<S>>,
}

impl<S: FulfillmentStore> FulfillmentPrepHandler<S> {
    /// Creates the handler over a tracker.
    #[must_use]
    pub fn new(tracker: Arc<FulfillmentTracker<S>>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl<S: FulfillmentStore> StageHandler for FulfillmentPrepHandler<S> {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Fulfillment
    }

    async fn execute(&self, ctx: &OrderContext) -> StageOutcome {
        if self.tracker.get_by_order(&ctx.order_id).await.is_ok() {
            debug!(order_id = %ctx.order_id, "Fulfillment already exists");
            return StageOutcome::success_with("fulfillment already exists");
        }
        match self.tracker.create(&ctx.order_id).await {
            Ok(f) => StageOutcome::success_with(format!("fulfillment {}", f.id)),
            Err(err) => StageOutcome::failure(err.to_string()),
        }
    }
}

/// Quotes, books the cheapest rate, and marks the fulfillment shipped.
pub struct ShippingHandler<S: FulfillmentStore> {
    gateway: Arc<ShippingGateway>,
    tracker: Arc<FulfillmentTracker<S>>,
}

impl<S: FulfillmentStore> ShippingHandler<S> {
    /// Creates the handler over the gateway and tracker.
    #[must_use]
    pub fn new(gateway: Arc<ShippingGateway>, tracker: Arc<FulfillmentTracker<S>>) -> Self {
        Self { gateway, tracker }
    }

    fn parse_route(ctx: &OrderContext) -> Result<(Address, Address, Vec<Package>), String> {
        let origin = ctx
            .order
            .get("origin_address")
            .cloned()
            .ok_or_else(|| "order has no origin address".to_string())
            .and_then(|v| serde_json::from_value(v).map_err(|e| e.to_string()))?;
        let destination = ctx
            .order
            .get("shipping_address")
            .cloned()
            .ok_or_else(|| "order has no shipping address".to_string())
            .and_then(|v| serde_json::from_value(v).map_err(|e| e.to_string()))?;
        let packages: Vec<Package> = ctx
            .order
            .get("packages")
            .cloned()
            .ok_or_else(|| "order has no packages".to_string())
            .and_then(|v| serde_json::from_value(v).map_err(|e| e.to_string()))?;
        Ok((origin, destination, packages))
    }
}

#[async_trait]
impl<S: FulfillmentStore> StageHandler for ShippingHandler<S> {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Shipping
    }

    async fn execute(&self, ctx: &OrderContext) -> StageOutcome {
        let (origin, destination, packages) = match Self::parse_route(ctx) {
            Ok(route) => route,
            Err(reason) => return StageOutcome::failure(reason),
        };

        let quote = match self
            .gateway
            .get_rates(&crate::core::RateRequest {
                origin: origin.clone(),
                destination: destination.clone(),
                packages: packages.clone(),
                carrier: None,
            })
            .await
        {
            Ok(quote) => quote,
            Err(err) => return StageOutcome::failure(err.to_string()),
        };

        let Some(cheapest) = quote.rates.iter().min_by_key(|r| r.price_cents) else {
            return StageOutcome::failure("no shipping rates available");
        };

        let booking = match self
            .gateway
            .create_shipment(&crate::core::ShipmentRequest {
                rate_id: cheapest.id.clone(),
                origin,
                destination,
                packages,
            })
            .await
        {
            Ok(booking) => booking,
            Err(err) => return StageOutcome::failure(err.to_string()),
        };

        let fulfillment = match self.tracker.get_by_order(&ctx.order_id).await {
            Ok(f) => f,
            Err(err) => return StageOutcome::failure(err.to_string()),
        };
        if let Err(err) = self
            .tracker
            .record_booking(fulfillment.id, &booking.carrier, &booking.tracking_number)
            .await
        {
            return StageOutcome::failure(err.to_string());
        }
        if let Err(err) = self.tracker.ship(fulfillment.id).await {
            return StageOutcome::failure(err.to_string());
        }

        StageOutcome::success_with(format!(
            "booked {} ({})",
            booking.carrier, booking.tracking_number
        ))
    }
}

/// Confirms final-mile delivery on the fulfillment record.
pub struct DeliveryHandler<S: FulfillmentStore> {
    tracker: Arc<FulfillmentTracker<S>>,
}

impl<S: FulfillmentStore> DeliveryHandler<S> {
    /// Creates the handler over a tracker.
    #[must_use]
    pub fn new(tracker: Arc<FulfillmentTracker<S>>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl<S: FulfillmentStore> StageHandler for DeliveryHandler<S> {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Delivery
    }

    async fn execute(&self, ctx: &OrderContext) -> StageOutcome {
        let fulfillment = match self.tracker.get_by_order(&ctx.order_id).await {
            Ok(f) => f,
            Err(err) => return StageOutcome::failure(err.to_string()),
        };
        if fulfillment.status == crate::core::FulfillmentStatus::Delivered {
            return StageOutcome::success_with("already delivered");
        }
        match self.tracker.deliver(fulfillment.id).await {
            Ok(_) => StageOutcome::success(),
            Err(err) => StageOutcome::failure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::fulfillment::InMemoryFulfillmentStore;
    use crate::testing::fixtures;
    use crate::testing::mocks::MockShippingProvider;
    use pretty_assertions::assert_eq;

    fn ctx_with_order(order: serde_json::Value) -> OrderContext {
        OrderContext {
            pipeline_id: uuid::Uuid::new_v4(),
            order_id: "order-1".to_string(),
            stage: PipelineStage::Validation,
            attempt: 1,
            order,
        }
    }

    #[tokio::test]
    async fn test_validation_accepts_complete_order() {
        let outcome = ValidationHandler.execute(&ctx_with_order(fixtures::order())).await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_validation_rejects_empty_items() {
        let mut order = fixtures::order();
        order["items"] = serde_json::json!([]);
        let outcome = ValidationHandler.execute(&ctx_with_order(order)).await;
        assert_eq!(outcome, StageOutcome::failure("order has no items"));
    }

    #[tokio::test]
    async fn test_validation_rejects_missing_address() {
        let mut order = fixtures::order();
        order.as_object_mut().unwrap().remove("shipping_address");
        let outcome = ValidationHandler.execute(&ctx_with_order(order)).await;
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_opaque_provider_maps_verdict() {
        struct Failing;
        #[async_trait]
        impl WorkProvider for Failing {
            async fn perform(&self, _ctx: &OrderContext) -> Result<(), String> {
                Err("render farm offline".to_string())
            }
        }

        let ok = OpaqueProviderHandler::new(PipelineStage::Render, Arc::new(AlwaysCompleteProvider));
        assert!(ok.execute(&ctx_with_order(fixtures::order())).await.is_success());

        let failing = OpaqueProviderHandler::new(PipelineStage::Render, Arc::new(Failing));
        assert_eq!(
            failing.execute(&ctx_with_order(fixtures::order())).await,
            StageOutcome::failure("render farm offline")
        );
    }

    #[tokio::test]
    async fn test_fulfillment_prep_creates_once() {
        let tracker = Arc::new(FulfillmentTracker::new(InMemoryFulfillmentStore::new()));
        let handler = FulfillmentPrepHandler::new(tracker.clone());
        let ctx = ctx_with_order(fixtures::order());

        assert!(handler.execute(&ctx).await.is_success());
        let first = tracker.get_by_order("order-1").await.unwrap();

        // Retry finds the existing record instead of duplicating it.
        assert!(handler.execute(&ctx).await.is_success());
        assert_eq!(tracker.get_by_order("order-1").await.unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_shipping_handler_books_cheapest_and_ships() {
        let provider = Arc::new(
            MockShippingProvider::new("fastship")
                .with_rate("express", 1500, 1, 2)
                .with_rate("ground", 600, 4, 8),
        );
        let gateway = Arc::new(ShippingGateway::new(
            vec![provider],
            &EngineConfig::default(),
        ));
        let tracker = Arc::new(FulfillmentTracker::new(InMemoryFulfillmentStore::new()));
        tracker.create("order-1").await.unwrap();

        let handler = ShippingHandler::new(gateway, tracker.clone());
        let outcome = handler.execute(&ctx_with_order(fixtures::order())).await;
        assert!(outcome.is_success(), "{outcome:?}");

        let f = tracker.get_by_order("order-1").await.unwrap();
        assert_eq!(f.status, crate::core::FulfillmentStatus::Shipped);
        assert_eq!(f.carrier.as_deref(), Some("fastship"));
        assert!(f.tracking_number.is_some());
    }

    #[tokio::test]
    async fn test_shipping_handler_fails_without_rates() {
        let gateway = Arc::new(ShippingGateway::new(vec![], &EngineConfig::default()));
        let tracker = Arc::new(FulfillmentTracker::new(InMemoryFulfillmentStore::new()));
        tracker.create("order-1").await.unwrap();

        let handler = ShippingHandler::new(gateway, tracker);
        let outcome = handler.execute(&ctx_with_order(fixtures::order())).await;
        assert_eq!(outcome, StageOutcome::failure("no shipping rates available"));
    }

    #[tokio::test]
    async fn test_delivery_handler_confirms_delivery() {
        let tracker = Arc::new(FulfillmentTracker::new(InMemoryFulfillmentStore::new()));
        let f = tracker.create("order-1").await.unwrap();
        tracker.ship(f.id).await.unwrap();

        let handler = DeliveryHandler::new(tracker.clone());
        assert!(handler.execute(&ctx_with_order(fixtures::order())).await.is_success());
        assert_eq!(
            tracker.get(f.id).await.unwrap().status,
            crate::core::FulfillmentStatus::Delivered
        );

        // Idempotent on retry.
        assert!(handler.execute(&ctx_with_order(fixtures::order())).await.is_success());
    }

    #[tokio::test]
    async fn test_delivery_handler_fails_before_shipment() {
        let tracker = Arc::new(FulfillmentTracker::new(InMemoryFulfillmentStore::new()));
        tracker.create("order-1").await.unwrap();

        let handler = DeliveryHandler::new(tracker);
        let outcome = handler.execute(&ctx_with_order(fixtures::order())).await;
        assert!(!outcome.is_success());
    }
}
