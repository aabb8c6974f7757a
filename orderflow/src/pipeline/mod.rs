//! Pipeline engine: the state machine sequencing stage handlers.

pub mod engine;
pub mod store;


pub use engine::PipelineEngine;
pub use store::{InMemoryPipelineStore, PipelineStore};
