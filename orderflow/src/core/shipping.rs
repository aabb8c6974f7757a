//! Shipping domain types: addresses, packages, rates, bookings.

use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    /// Recipient or sender name.
    pub name: String,
    /// Street line 1.
    pub street1: String,
    /// Street line 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    /// City.
    pub city: String,
    /// State or region code.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
    /// ISO country code.
    pub country: String,
}

/// Physical package dimensions and weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Weight in grams.
    pub weight_grams: u32,
    /// Length in millimeters.
    pub length_mm: u32,
    /// Width in millimeters.
    pub width_mm: u32,
    /// Height in millimeters.
    pub height_mm: u32,
}

/// A priced shipping offer returned by one provider.
///
/// Ephemeral: not persisted beyond the request/response unless the caller
/// caches it. The `id` is provider-scoped, `{carrier}_{service_level}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRate {
    /// Provider-scoped rate identifier.
    pub id: String,
    /// Carrier identity.
    pub carrier: String,
    /// Service level (e.g. "standard", "express").
    pub service_level: String,
    /// Price in cents.
    pub price_cents: u64,
    /// ISO currency code.
    pub currency: String,
    /// Minimum estimated delivery days.
    pub estimated_days_min: u32,
    /// Maximum estimated delivery days.
    pub estimated_days_max: u32,
}

impl ShippingRate {
    /// Builds the provider-scoped rate id for a carrier and service level.
    #[must_use]
    pub fn make_id(carrier: &str, service_level: &str) -> String {
        format!("{carrier}_{service_level}")
    }
}

/// A rate quote request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRequest {
    /// Origin address.
    pub origin: Address,
    /// Destination address.
    pub destination: Address,
    /// Packages to ship.
    pub packages: Vec<Package>,
    /// Restrict the quote to a single carrier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

/// A shipment booking request against a previously quoted rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRequest {
    /// The quoted rate to book.
    pub rate_id: String,
    /// Origin address.
    pub origin: Address,
    /// Destination address.
    pub destination: Address,
    /// Packages to ship.
    pub packages: Vec<Package>,
}

/// The result of booking a shipment with a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResult {
    /// Provider-side shipment identifier.
    pub shipment_id: String,
    /// Carrier that booked the shipment.
    pub carrier: String,
    /// Tracking number assigned by the carrier.
    pub tracking_number: String,
    /// URL of the shipping label, if issued at booking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_url: Option<String>,
    /// Booked price in cents.
    pub price_cents: u64,
}

/// Result of advisory address validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressValidation {
    /// Whether the address is deliverable as far as the provider can tell.
    pub valid: bool,
    /// Normalized form of the address.
    pub normalized: Address,
    /// Provider hints about problems, empty when valid.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl AddressValidation {
    /// Optimistic validation used when no provider is available. Address
    /// validation is advisory and degrades gracefully.
    #[must_use]
    pub fn optimistic(address: Address) -> Self {
        Self {
            valid: true,
            normalized: address,
            messages: Vec::new(),
        }
    }
}

/// A static rate-card row configured per brand, independent of live carrier
/// quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandRate {
    /// Rate identifier.
    pub id: String,
    /// Owning brand.
    pub brand_id: String,
    /// Display name shown at checkout.
    pub name: String,
    /// Flat price in cents.
    pub price_cents: u64,
    /// ISO currency code.
    pub currency: String,
    /// Whether the rate is currently offered.
    pub is_active: bool,
    /// When the row was configured.
    pub created_at: Timestamp,
}
