//! Shipping gateway: carrier provider fan-out behind one contract.

pub mod brand_rates;
pub mod gateway;
pub mod provider;

pub use brand_rates::BrandRateTable;
pub use gateway::{ProviderFailure, RateQuoteResponse, ShippingGateway};
pub use provider::ShippingProvider;
