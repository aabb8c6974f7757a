//! Provider registry and concurrent rate fan-out.

use crate::config::EngineConfig;
use crate::core::{Address, AddressValidation, BookingResult, BrandRate, RateRequest, ShipmentRequest, ShippingRate};
use crate::errors::{OrderflowError, Result};
use crate::shipping::brand_rates::BrandRateTable;
use crate::shipping::provider::ShippingProvider;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// One provider's failure during rate aggregation.
///
/// Individual provider failures never fail the aggregate call; they are
/// logged and reported here so callers can see which carriers are missing
/// from the result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    /// The failing provider's carrier identity.
    pub carrier: String,
    /// What went wrong ("timeout" or the adapter's error).
    pub reason: String,
}

/// Aggregated rate-quote response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuoteResponse {
    /// Concatenated rates from all responding providers, not deduplicated.
    pub rates: Vec<ShippingRate>,
    /// Providers that errored or timed out and were dropped from `rates`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_errors: Vec<ProviderFailure>,
}

/// Aggregates carrier provider adapters behind one contract.
///
/// The registry is assembled at construction and read-only afterwards, so
/// request-time access is lock-free.
pub struct ShippingGateway {
    providers: Vec<Arc<dyn ShippingProvider>>,
    brand_rates: BrandRateTable,
    provider_timeout: Duration,
}

impl ShippingGateway {
    /// Creates a gateway over a fixed provider registry.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn ShippingProvider>>, config: &EngineConfig) -> Self {
        Self {
            providers,
            brand_rates: BrandRateTable::new(),
            provider_timeout: config.provider_timeout(),
        }
    }

    /// Replaces the brand rate table (static per-brand rate cards).
    #[must_use]
    pub fn with_brand_rates(mut self, brand_rates: BrandRateTable) -> Self {
        self.brand_rates = brand_rates;
        self
    }

    /// Quotes rates, fanning out to every matching provider concurrently.
    ///
    /// Each provider call is independently time-bounded. A provider that
    /// errors or times out is dropped from the result set and reported in
    /// `provider_errors`. An empty registry or an unmatched carrier filter
    /// yields an empty result without calling any adapter.
    pub async fn get_rates(&self, request: &RateRequest) -> Result<RateQuoteResponse> {
        let matching: Vec<&Arc<dyn ShippingProvider>> = self
            .providers
            .iter()
            .filter(|p| {
                request
                    .carrier
                    .as_deref()
                    .map_or(true, |c| p.carrier() == c)
            })
            .collect();

        if matching.is_empty() {
            debug!(carrier = ?request.carrier, "No matching shipping providers");
            return Ok(RateQuoteResponse {
                rates: Vec::new(),
                provider_errors: Vec::new(),
            });
        }

        let calls = matching.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let per_call_timeout = self.provider_timeout;
            async move {
                let carrier = provider.carrier().to_string();
                match timeout(per_call_timeout, provider.get_rates(request)).await {
                    Ok(Ok(rates)) => (carrier, Ok(rates)),
                    Ok(Err(err)) => (carrier, Err(err.to_string())),
                    Err(_) => (carrier, Err("timeout".to_string())),
                }
            }
        });

        let mut rates = Vec::new();
        let mut provider_errors = Vec::new();
        for (carrier, outcome) in join_all(calls).await {
            match outcome {
                Ok(provider_rates) => rates.extend(provider_rates),
                Err(reason) => {
                    warn!(carrier = %carrier, reason = %reason, "Dropping provider from rate aggregation");
                    provider_errors.push(ProviderFailure { carrier, reason });
                }
            }
        }

        Ok(RateQuoteResponse {
            rates,
            provider_errors,
        })
    }

    /// Books a shipment with the provider that owns the quoted rate.
    pub async fn create_shipment(&self, request: &ShipmentRequest) -> Result<BookingResult> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.owns_rate(&request.rate_id))
            .ok_or_else(|| {
                OrderflowError::not_found("No shipping provider for rate", &request.rate_id)
            })?;
        provider.create_shipment(request).await
    }

    /// Fetches the label for a booked shipment from the carrier that booked
    /// it.
    pub async fn get_label(&self, carrier: &str, shipment_id: &str) -> Result<String> {
        self.provider_by_carrier(carrier)?
            .get_label(shipment_id)
            .await
    }

    /// Cancels a booked shipment with the carrier that booked it.
    pub async fn cancel_shipment(&self, carrier: &str, shipment_id: &str) -> Result<()> {
        self.provider_by_carrier(carrier)?
            .cancel_shipment(shipment_id)
            .await
    }

    /// Validates an address through the designated default provider (the
    /// first registered). With an empty registry validation degrades to an
    /// optimistic pass: it is advisory, not load-bearing.
    pub async fn validate_address(&self, address: &Address) -> Result<AddressValidation> {
        match self.providers.first() {
            Some(provider) => provider.validate_address(address).await,
            None => Ok(AddressValidation::optimistic(address.clone())),
        }
    }

    /// Returns the de-duplicated carrier identifiers across all registered
    /// providers, in registration order.
    #[must_use]
    pub fn get_carriers(&self) -> Vec<String> {
        let mut carriers: Vec<String> = Vec::new();
        for provider in &self.providers {
            let carrier = provider.carrier();
            if !carriers.iter().any(|c| c == carrier) {
                carriers.push(carrier.to_string());
            }
        }
        carriers
    }

    /// Returns the active static rate-card rows for a brand. Independent of
    /// live provider calls.
    #[must_use]
    pub fn get_brand_rates(&self, brand_id: &str) -> Vec<BrandRate> {
        self.brand_rates.active_for_brand(brand_id)
    }

    fn provider_by_carrier(&self, carrier: &str) -> Result<&Arc<dyn ShippingProvider>> {
        self.providers
            .iter()
            .find(|p| p.carrier() == carrier)
            .ok_or_else(|| OrderflowError::not_found("Carrier", carrier))
    }
}
