//! Hand-written mocks with scripted behavior and call counters.

use crate::core::{
    Address, AddressValidation, BookingResult, PipelineStage, RateRequest, ShipmentRequest,
    ShippingRate,
};
use crate::errors::{OrderflowError, Result};
use crate::shipping::ShippingProvider;
use crate::stages::{OrderContext, StageHandler, StageOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// A scripted stage handler.
///
/// Succeeds by default; `fail_with` flips it to failure until `succeed` is
/// called. `delay_ms` adds latency before the verdict, for tests that need a
/// handler to still be in flight when something else happens.
pub struct MockStageHandler {
    stage: PipelineStage,
    fail_reason: Mutex<Option<String>>,
    delay_ms: AtomicU64,
    calls: AtomicUsize,
}

impl MockStageHandler {
    /// Creates a handler for a stage that always succeeds.
    #[must_use]
    pub fn new(stage: PipelineStage) -> Self {
        Self {
            stage,
            fail_reason: Mutex::new(None),
            delay_ms: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Scripts failure with the given reason for subsequent executions.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.fail_reason.lock() = Some(reason.into());
    }

    /// Scripts success for subsequent executions.
    pub fn succeed(&self) {
        *self.fail_reason.lock() = None;
    }

    /// Adds latency before each execution returns.
    pub fn delay_ms(&self, ms: u64) {
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Number of times the handler has executed.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StageHandler for MockStageHandler {
    fn stage(&self) -> PipelineStage {
        self.stage
    }

    async fn execute(&self, _ctx: &OrderContext) -> StageOutcome {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_reason.lock().clone() {
            Some(reason) => StageOutcome::failure(reason),
            None => StageOutcome::success(),
        }
    }
}

/// One configured rate on a [`MockShippingProvider`].
#[derive(Debug, Clone)]
struct RateSpec {
    service_level: String,
    price_cents: u64,
    estimated_days_min: u32,
    estimated_days_max: u32,
}

/// A scripted carrier provider.
///
/// Quotes the configured rates, or fails every call when built with
/// `failing`. `with_latency_ms` delays each call, for timeout tests.
pub struct MockShippingProvider {
    carrier: String,
    rates: Vec<RateSpec>,
    fail_reason: Option<String>,
    latency_ms: u64,
    rate_calls: AtomicUsize,
    shipment_calls: AtomicUsize,
    validate_calls: AtomicUsize,
}

impl MockShippingProvider {
    /// Creates a provider for a carrier with no rates configured.
    #[must_use]
    pub fn new(carrier: impl Into<String>) -> Self {
        Self {
            carrier: carrier.into(),
            rates: Vec::new(),
            fail_reason: None,
            latency_ms: 0,
            rate_calls: AtomicUsize::new(0),
            shipment_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
        }
    }

    /// Adds a quotable rate.
    #[must_use]
    pub fn with_rate(
        mut self,
        service_level: impl Into<String>,
        price_cents: u64,
        estimated_days_min: u32,
        estimated_days_max: u32,
    ) -> Self {
        self.rates.push(RateSpec {
            service_level: service_level.into(),
            price_cents,
            estimated_days_min,
            estimated_days_max,
        });
        self
    }

    /// Makes every call fail with the given reason.
    #[must_use]
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.fail_reason = Some(reason.into());
        self
    }

    /// Adds latency to every call.
    #[must_use]
    pub fn with_latency_ms(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    /// Number of `get_rates` calls.
    pub fn rate_calls(&self) -> usize {
        self.rate_calls.load(Ordering::SeqCst)
    }

    /// Number of `create_shipment` calls.
    pub fn shipment_calls(&self) -> usize {
        self.shipment_calls.load(Ordering::SeqCst)
    }

    /// Number of `validate_address` calls.
    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> Result<()> {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        match &self.fail_reason {
            Some(reason) => Err(OrderflowError::provider(&self.carrier, reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ShippingProvider for MockShippingProvider {
    fn carrier(&self) -> &str {
        &self.carrier
    }

    async fn get_rates(&self, _request: &RateRequest) -> Result<Vec<ShippingRate>> {
        self.rate_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        Ok(self
            .rates
            .iter()
            .map(|spec| ShippingRate {
                id: ShippingRate::make_id(&self.carrier, &spec.service_level),
                carrier: self.carrier.clone(),
                service_level: spec.service_level.clone(),
                price_cents: spec.price_cents,
                currency: "USD".to_string(),
                estimated_days_min: spec.estimated_days_min,
                estimated_days_max: spec.estimated_days_max,
            })
            .collect())
    }

    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<BookingResult> {
        let n = self.shipment_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate().await?;
        let price_cents = self
            .rates
            .iter()
            .find(|spec| ShippingRate::make_id(&self.carrier, &spec.service_level) == request.rate_id)
            .map_or(0, |spec| spec.price_cents);
        Ok(BookingResult {
            shipment_id: format!("shp-{n}"),
            carrier: self.carrier.clone(),
            tracking_number: format!("TRK-{}-{n}", self.carrier.to_uppercase()),
            label_url: Some(format!("https://labels.test/shp-{n}.pdf")),
            price_cents,
        })
    }

    async fn get_label(&self, shipment_id: &str) -> Result<String> {
        self.simulate().await?;
        Ok(format!("https://labels.test/{shipment_id}.pdf"))
    }

    async fn cancel_shipment(&self, _shipment_id: &str) -> Result<()> {
        self.simulate().await
    }

    async fn validate_address(&self, address: &Address) -> Result<AddressValidation> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        Ok(AddressValidation::optimistic(address.clone()))
    }
}
