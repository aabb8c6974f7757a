//! Fulfillment tracking: the physical-shipment state machine.
//!
//! Looser than the production pipeline, consumed by operational tooling.
//! Status only moves forward along the shipment graph; `Cancelled` is
//! reachable from any pre-shipment state.

use crate::core::{Fulfillment, FulfillmentStatus};
use crate::errors::{OrderflowError, Result};
use crate::utils::now_utc;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

/// Persistence contract for fulfillment records.
#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    /// Persists a new record.
    async fn create(&self, fulfillment: Fulfillment) -> Result<()>;
    /// Loads a record by id.
    async fn get(&self, id: Uuid) -> Result<Option<Fulfillment>>;
    /// Loads the record for an order, if one exists.
    async fn find_by_order(&self, order_id: &str) -> Result<Option<Fulfillment>>;
    /// Replaces a record.
    async fn update(&self, fulfillment: Fulfillment) -> Result<()>;
}

/// Dashmap-backed store for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryFulfillmentStore {
    records: DashMap<Uuid, Fulfillment>,
}

impl InMemoryFulfillmentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FulfillmentStore for InMemoryFulfillmentStore {
    async fn create(&self, fulfillment: Fulfillment) -> Result<()> {
        self.records.insert(fulfillment.id, fulfillment);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Fulfillment>> {
        Ok(self.records.get(&id).map(|e| e.value().clone()))
    }

    async fn find_by_order(&self, order_id: &str) -> Result<Option<Fulfillment>> {
        Ok(self
            .records
            .iter()
            .find(|e| e.value().order_id == order_id)
            .map(|e| e.value().clone()))
    }

    async fn update(&self, fulfillment: Fulfillment) -> Result<()> {
        self.records.insert(fulfillment.id, fulfillment);
        Ok(())
    }
}

/// Drives fulfillment records through the shipment status graph.
pub struct FulfillmentTracker<S: FulfillmentStore> {
    store: S,
}

impl<S: FulfillmentStore> FulfillmentTracker<S> {
    /// Creates a tracker over a store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a pending fulfillment for an order.
    pub async fn create(&self, order_id: &str) -> Result<Fulfillment> {
        let fulfillment = Fulfillment::new(order_id);
        self.store.create(fulfillment.clone()).await?;
        info!(fulfillment_id = %fulfillment.id, order_id, "Created fulfillment");
        Ok(fulfillment)
    }

    /// Loads a fulfillment snapshot.
    pub async fn get(&self, id: Uuid) -> Result<Fulfillment> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| OrderflowError::not_found("Fulfillment", id))
    }

    /// Loads the fulfillment for an order.
    pub async fn get_by_order(&self, order_id: &str) -> Result<Fulfillment> {
        self.store
            .find_by_order(order_id)
            .await?
            .ok_or_else(|| OrderflowError::not_found("Fulfillment for order", order_id))
    }

    /// Records the carrier booking on a pre-shipment fulfillment.
    pub async fn record_booking(
        &self,
        id: Uuid,
        carrier: &str,
        tracking_number: &str,
    ) -> Result<Fulfillment> {
        let mut f = self.get(id).await?;
        if !f.status.is_pre_shipment() {
            return Err(OrderflowError::invalid_transition(
                "Fulfillment",
                f.status,
                "record_booking",
            ));
        }
        f.carrier = Some(carrier.to_string());
        f.tracking_number = Some(tracking_number.to_string());
        f.updated_at = now_utc();
        self.store.update(f.clone()).await?;
        Ok(f)
    }

    /// Marks the shipment handed to the carrier. Legal only from pre-shipment
    /// states.
    pub async fn ship(&self, id: Uuid) -> Result<Fulfillment> {
        self.transition(id, FulfillmentStatus::Shipped, |s| s.is_pre_shipment())
            .await
    }

    /// Marks the shipment in the carrier network. Forward-only supplement to
    /// `ship`/`deliver`, fed by carrier webhooks.
    pub async fn mark_in_transit(&self, id: Uuid) -> Result<Fulfillment> {
        self.transition(id, FulfillmentStatus::InTransit, |s| {
            s == FulfillmentStatus::Shipped
        })
        .await
    }

    /// Marks the shipment on the final-mile vehicle.
    pub async fn mark_out_for_delivery(&self, id: Uuid) -> Result<Fulfillment> {
        self.transition(id, FulfillmentStatus::OutForDelivery, |s| {
            matches!(
                s,
                FulfillmentStatus::Shipped | FulfillmentStatus::InTransit
            )
        })
        .await
    }

    /// Marks the shipment delivered. Legal only once it is in the carrier
    /// network.
    pub async fn deliver(&self, id: Uuid) -> Result<Fulfillment> {
        self.transition(id, FulfillmentStatus::Delivered, |s| {
            s.is_in_carrier_network()
        })
        .await
    }

    /// Cancels the fulfillment. Legal only before shipment.
    pub async fn cancel(&self, id: Uuid) -> Result<Fulfillment> {
        self.transition(id, FulfillmentStatus::Cancelled, |s| s.is_pre_shipment())
            .await
    }

    async fn transition(
        &self,
        id: Uuid,
        to: FulfillmentStatus,
        legal_from: impl Fn(FulfillmentStatus) -> bool,
    ) -> Result<Fulfillment> {
        let mut f = self.get(id).await?;
        if !legal_from(f.status) {
            return Err(OrderflowError::invalid_transition(
                "Fulfillment",
                f.status,
                to,
            ));
        }
        f.status = to;
        let now = now_utc();
        match to {
            FulfillmentStatus::Shipped => f.shipped_at = Some(now),
            FulfillmentStatus::Delivered => f.delivered_at = Some(now),
            _ => {}
        }
        f.updated_at = now;
        self.store.update(f.clone()).await?;
        info!(fulfillment_id = %id, status = %to, "Fulfillment transition");
        Ok(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tracker() -> FulfillmentTracker<InMemoryFulfillmentStore> {
        FulfillmentTracker::new(InMemoryFulfillmentStore::new())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let t = tracker();
        let f = t.create("order-1").await.unwrap();
        let loaded = t.get(f.id).await.unwrap();
        assert_eq!(loaded.status, FulfillmentStatus::Pending);
        assert_eq!(loaded.order_id, "order-1");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let t = tracker();
        assert!(t.get(Uuid::new_v4()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_ship_from_pending_sets_shipped_at() {
        let t = tracker();
        let f = t.create("order-1").await.unwrap();
        let shipped = t.ship(f.id).await.unwrap();
        assert_eq!(shipped.status, FulfillmentStatus::Shipped);
        assert!(shipped.shipped_at.is_some());
    }

    #[tokio::test]
    async fn test_full_forward_path() {
        let t = tracker();
        let f = t.create("order-1").await.unwrap();
        t.ship(f.id).await.unwrap();
        t.mark_in_transit(f.id).await.unwrap();
        t.mark_out_for_delivery(f.id).await.unwrap();
        let delivered = t.deliver(f.id).await.unwrap();
        assert_eq!(delivered.status, FulfillmentStatus::Delivered);
        assert!(delivered.delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_deliver_straight_from_shipped() {
        let t = tracker();
        let f = t.create("order-1").await.unwrap();
        t.ship(f.id).await.unwrap();
        assert!(t.deliver(f.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_ship_after_delivery_fails_and_leaves_record_unchanged() {
        let t = tracker();
        let f = t.create("order-1").await.unwrap();
        t.ship(f.id).await.unwrap();
        let delivered = t.deliver(f.id).await.unwrap();

        let err = t.ship(f.id).await.unwrap_err();
        assert!(err.is_invalid_transition());

        let unchanged = t.get(f.id).await.unwrap();
        assert_eq!(unchanged.status, FulfillmentStatus::Delivered);
        assert_eq!(unchanged.delivered_at, delivered.delivered_at);
        assert_eq!(unchanged.updated_at, delivered.updated_at);
    }

    #[tokio::test]
    async fn test_deliver_before_ship_fails() {
        let t = tracker();
        let f = t.create("order-1").await.unwrap();
        assert!(t.deliver(f.id).await.unwrap_err().is_invalid_transition());
    }

    #[tokio::test]
    async fn test_cancel_only_pre_shipment() {
        let t = tracker();
        let f = t.create("order-1").await.unwrap();
        let cancelled = t.cancel(f.id).await.unwrap();
        assert_eq!(cancelled.status, FulfillmentStatus::Cancelled);

        let f2 = t.create("order-2").await.unwrap();
        t.ship(f2.id).await.unwrap();
        assert!(t.cancel(f2.id).await.unwrap_err().is_invalid_transition());
    }

    #[tokio::test]
    async fn test_record_booking_sets_carrier_and_tracking() {
        let t = tracker();
        let f = t.create("order-1").await.unwrap();
        let booked = t.record_booking(f.id, "fastship", "TRK123").await.unwrap();
        assert_eq!(booked.carrier.as_deref(), Some("fastship"));
        assert_eq!(booked.tracking_number.as_deref(), Some("TRK123"));

        t.ship(f.id).await.unwrap();
        assert!(t
            .record_booking(f.id, "fastship", "TRK456")
            .await
            .unwrap_err()
            .is_invalid_transition());
    }

    #[tokio::test]
    async fn test_get_by_order() {
        let t = tracker();
        let f = t.create("order-7").await.unwrap();
        let found = t.get_by_order("order-7").await.unwrap();
        assert_eq!(found.id, f.id);
        assert!(t.get_by_order("order-8").await.unwrap_err().is_not_found());
    }
}
