//! Handler registry: one handler per stage, wired at startup.

use crate::core::PipelineStage;
use crate::errors::{OrderflowError, Result};
use crate::stages::StageHandler;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps every pipeline stage to its handler.
///
/// Built once with explicit constructor injection; a missing stage is a
/// validation error at build time, never a runtime lookup failure.
pub struct HandlerRegistry {
    handlers: HashMap<PipelineStage, Arc<dyn StageHandler>>,
}

/// Builder for [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<PipelineStage, Arc<dyn StageHandler>>,
}

impl HandlerRegistryBuilder {
    /// Registers a handler under its declared stage. Replaces any previous
    /// handler for that stage.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn StageHandler>) -> Self {
        self.handlers.insert(handler.stage(), handler);
        self
    }

    /// Validates that every stage has a handler and builds the registry.
    pub fn build(self) -> Result<HandlerRegistry> {
        let missing: Vec<&str> = PipelineStage::ALL
            .iter()
            .filter(|s| !self.handlers.contains_key(s))
            .map(|s| s.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(OrderflowError::Validation(format!(
                "no handler registered for stages: {}",
                missing.join(", ")
            )));
        }
        Ok(HandlerRegistry {
            handlers: self.handlers,
        })
    }
}

impl HandlerRegistry {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Returns the handler for a stage.
    ///
    /// Infallible by construction: `build` guarantees full coverage.
    #[must_use]
    pub fn handler_for(&self, stage: PipelineStage) -> Arc<dyn StageHandler> {
        self.handlers
            .get(&stage)
            .cloned()
            .unwrap_or_else(|| unreachable!("registry built without stage {stage}"))
    }
}
