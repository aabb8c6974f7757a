//! # Orderflow
//!
//! An order-fulfillment orchestration engine.
//!
//! Orderflow drives each order through a fixed production pipeline and the
//! operational surfaces around it:
//!
//! - **Pipeline engine**: a state machine sequencing the seven production
//!   stages with advance/retry/cancel semantics
//! - **Dead-letter management**: inspect, retry, remove, and purge failed
//!   stage jobs per queue
//! - **Shipping gateway**: N carrier adapters behind one contract with
//!   concurrent rate fan-out
//! - **Fulfillment tracking**: a forward-only state machine for the physical
//!   shipment
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use orderflow::prelude::*;
//!
//! let engine = PipelineEngine::new(store, registry, queue);
//! let pipeline = engine.create("order-1", order_json).await?;
//! let pipeline = engine.advance(pipeline.id).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod dlq;
pub mod errors;
pub mod events;
pub mod fulfillment;
pub mod observability;
pub mod pipeline;
pub mod queue;
pub mod service;
pub mod shipping;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::core::{
        Address, AddressValidation, BookingResult, BrandRate, FailedJobRecord, Fulfillment,
        FulfillmentStatus, Package, Pipeline, PipelineStage, PipelineStatus, QueueName,
        RateRequest, ShipmentRequest, ShippingRate, StageJob, StageTransition, TransitionOutcome,
    };
    pub use crate::dlq::{DeadLetterManager, QueueFailureStats};
    pub use crate::errors::{OrderflowError, Result};
    pub use crate::events::{
        ChannelEventSink, EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent,
    };
    pub use crate::fulfillment::{
        FulfillmentStore, FulfillmentTracker, InMemoryFulfillmentStore,
    };
    pub use crate::pipeline::{InMemoryPipelineStore, PipelineEngine, PipelineStore};
    pub use crate::queue::{InMemoryJobQueue, JobQueue};
    pub use crate::service::OrderflowService;
    pub use crate::shipping::{
        BrandRateTable, ProviderFailure, RateQuoteResponse, ShippingGateway, ShippingProvider,
    };
    pub use crate::stages::{
        HandlerRegistry, OrderContext, StageHandler, StageOutcome,
    };
}
