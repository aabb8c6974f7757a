//! Carrier provider contract.

use crate::core::{Address, AddressValidation, BookingResult, RateRequest, ShipmentRequest, ShippingRate};
use crate::errors::Result;
use async_trait::async_trait;

/// One carrier integration.
///
/// Every adapter exposes the same fixed surface; the gateway holds a
/// homogeneous collection of this trait and never inspects adapter shape at
/// runtime.
#[async_trait]
pub trait ShippingProvider: Send + Sync {
    /// Stable carrier identity (e.g. "fastship").
    fn carrier(&self) -> &str;

    /// Quotes rates for a route and package set.
    async fn get_rates(&self, request: &RateRequest) -> Result<Vec<ShippingRate>>;

    /// Books a shipment against one of this provider's quoted rates.
    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<BookingResult>;

    /// Fetches the label URL for a booked shipment.
    async fn get_label(&self, shipment_id: &str) -> Result<String>;

    /// Cancels a booked shipment.
    async fn cancel_shipment(&self, shipment_id: &str) -> Result<()>;

    /// Advisory address validation.
    async fn validate_address(&self, address: &Address) -> Result<AddressValidation>;

    /// Whether a quoted rate id belongs to this provider.
    ///
    /// Rate ids are provider-scoped (`{carrier}_{service_level}`), so prefix
    /// ownership is the default.
    fn owns_rate(&self, rate_id: &str) -> bool {
        rate_id.starts_with(&format!("{}_", self.carrier()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockShippingProvider;

    #[test]
    fn test_owns_rate_by_prefix() {
        let provider = MockShippingProvider::new("fastship");
        assert!(provider.owns_rate("fastship_express"));
        assert!(!provider.owns_rate("slowship_express"));
        // A bare carrier name without a service level is not a rate id.
        assert!(!provider.owns_rate("fastship"));
    }
}
