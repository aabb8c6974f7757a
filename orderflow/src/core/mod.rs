//! Core domain model: pipelines, jobs, fulfillments, and shipping types.

pub mod fulfillment;
pub mod job;
pub mod pipeline;
pub mod shipping;

pub use fulfillment::{Fulfillment, FulfillmentStatus};
pub use job::{FailedJobRecord, QueueName, StageJob};
pub use pipeline::{
    DeadLetterRef, Pipeline, PipelineStage, PipelineStatus, StageTransition, TransitionOutcome,
};
pub use shipping::{
    Address, AddressValidation, BookingResult, BrandRate, Package, RateRequest, ShipmentRequest,
    ShippingRate,
};
