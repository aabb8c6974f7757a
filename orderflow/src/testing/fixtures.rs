//! Canned domain values for tests.

use crate::core::{Address, Package, RateRequest, ShipmentRequest};

/// A deliverable destination address.
#[must_use]
pub fn destination_address() -> Address {
    Address {
        name: "Jo Smith".to_string(),
        street1: "1 Main St".to_string(),
        street2: None,
        city: "Portland".to_string(),
        state: "OR".to_string(),
        postal_code: "97201".to_string(),
        country: "US".to_string(),
    }
}

/// A warehouse origin address.
#[must_use]
pub fn origin_address() -> Address {
    Address {
        name: "Warehouse A".to_string(),
        street1: "500 Depot Rd".to_string(),
        street2: Some("Dock 3".to_string()),
        city: "Reno".to_string(),
        state: "NV".to_string(),
        postal_code: "89501".to_string(),
        country: "US".to_string(),
    }
}

/// A small single-parcel package.
#[must_use]
pub fn package() -> Package {
    Package {
        weight_grams: 750,
        length_mm: 300,
        width_mm: 220,
        height_mm: 120,
    }
}

/// A complete order snapshot: items, both addresses, and a package set.
#[must_use]
pub fn order() -> serde_json::Value {
    serde_json::json!({
        "items": [
            { "sku": "MUG-CLASSIC-11", "quantity": 2 },
            { "sku": "POSTER-A2", "quantity": 1 }
        ],
        "shipping_address": destination_address(),
        "origin_address": origin_address(),
        "packages": [package()],
    })
}

/// A rate request for the fixture route, optionally pinned to one carrier.
#[must_use]
pub fn rate_request(carrier: Option<&str>) -> RateRequest {
    RateRequest {
        origin: origin_address(),
        destination: destination_address(),
        packages: vec![package()],
        carrier: carrier.map(ToString::to_string),
    }
}

/// A booking request for the fixture route against the given rate.
#[must_use]
pub fn shipment_request(rate_id: &str) -> ShipmentRequest {
    ShipmentRequest {
        rate_id: rate_id.to_string(),
        origin: origin_address(),
        destination: destination_address(),
        packages: vec![package()],
    }
}
