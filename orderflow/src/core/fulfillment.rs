//! Fulfillment record and shipment status graph.
//!
//! A [`Fulfillment`] tracks the physical shipment for an order. Its lifecycle
//! is independent from the production pipeline: it is created once the
//! pipeline reaches fulfillment preparation and never deleted.

use crate::utils::{generate_uuid, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical shipment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    /// Created, waiting for warehouse action.
    Pending,
    /// Items being picked.
    Picking,
    /// Items being packed.
    Packing,
    /// Packed and waiting for carrier pickup.
    ReadyToShip,
    /// Handed to the carrier.
    Shipped,
    /// Moving through the carrier network.
    InTransit,
    /// On the final-mile vehicle.
    OutForDelivery,
    /// Delivered to the customer.
    Delivered,
    /// Cancelled before shipment.
    Cancelled,
}

impl FulfillmentStatus {
    /// Pre-shipment states, the only states from which `ship` and `cancel`
    /// are legal.
    #[must_use]
    pub fn is_pre_shipment(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Picking | Self::Packing | Self::ReadyToShip
        )
    }

    /// States from which `deliver` is legal.
    #[must_use]
    pub fn is_in_carrier_network(self) -> bool {
        matches!(self, Self::Shipped | Self::InTransit | Self::OutForDelivery)
    }

    /// Returns the status name in wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Picking => "PICKING",
            Self::Packing => "PACKING",
            Self::ReadyToShip => "READY_TO_SHIP",
            Self::Shipped => "SHIPPED",
            Self::InTransit => "IN_TRANSIT",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The physical shipment record for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fulfillment {
    /// Unique fulfillment identifier.
    pub id: Uuid,
    /// The order being shipped.
    pub order_id: String,
    /// Shipment status.
    pub status: FulfillmentStatus,
    /// Carrier handling the shipment, set at booking.
    pub carrier: Option<String>,
    /// Carrier tracking number, set at booking.
    pub tracking_number: Option<String>,
    /// When the shipment left the warehouse.
    pub shipped_at: Option<Timestamp>,
    /// When the shipment reached the customer.
    pub delivered_at: Option<Timestamp>,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

impl Fulfillment {
    /// Creates a new pending fulfillment for an order.
    #[must_use]
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            id: generate_uuid(),
            order_id: order_id.into(),
            status: FulfillmentStatus::Pending,
            carrier: None,
            tracking_number: None,
            shipped_at: None,
            delivered_at: None,
            updated_at: now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_shipment_states() {
        assert!(FulfillmentStatus::Pending.is_pre_shipment());
        assert!(FulfillmentStatus::Picking.is_pre_shipment());
        assert!(FulfillmentStatus::Packing.is_pre_shipment());
        assert!(FulfillmentStatus::ReadyToShip.is_pre_shipment());
        assert!(!FulfillmentStatus::Shipped.is_pre_shipment());
        assert!(!FulfillmentStatus::Delivered.is_pre_shipment());
        assert!(!FulfillmentStatus::Cancelled.is_pre_shipment());
    }

    #[test]
    fn test_carrier_network_states() {
        assert!(FulfillmentStatus::Shipped.is_in_carrier_network());
        assert!(FulfillmentStatus::InTransit.is_in_carrier_network());
        assert!(FulfillmentStatus::OutForDelivery.is_in_carrier_network());
        assert!(!FulfillmentStatus::Pending.is_in_carrier_network());
        assert!(!FulfillmentStatus::Delivered.is_in_carrier_network());
    }

    #[test]
    fn test_new_fulfillment_is_pending() {
        let f = Fulfillment::new("order-1");
        assert_eq!(f.status, FulfillmentStatus::Pending);
        assert!(f.shipped_at.is_none());
        assert!(f.delivered_at.is_none());
    }
}
