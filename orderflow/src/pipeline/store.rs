//! Pipeline persistence contract.

use crate::core::Pipeline;
use crate::errors::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

/// Persistence contract for pipeline records.
///
/// Records are retained indefinitely for audit; there is no delete. `update`
/// is a compare-and-swap on [`Pipeline::version`]: a writer holding a stale
/// snapshot is rejected rather than allowed to overwrite a newer commit.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Persists a new pipeline.
    async fn create(&self, pipeline: Pipeline) -> Result<()>;
    /// Loads a pipeline by id.
    async fn get(&self, id: Uuid) -> Result<Option<Pipeline>>;
    /// Replaces a pipeline record if the stored version matches the
    /// snapshot's. On success the snapshot's version is bumped in place and
    /// `true` is returned; `false` means a conflicting commit landed first
    /// and the caller must re-read.
    async fn update(&self, pipeline: &mut Pipeline) -> Result<bool>;
}

/// Dashmap-backed store for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryPipelineStore {
    records: DashMap<Uuid, Pipeline>,
}

impl InMemoryPipelineStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no pipelines are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn create(&self, pipeline: Pipeline) -> Result<()> {
        self.records.insert(pipeline.id, pipeline);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Pipeline>> {
        Ok(self.records.get(&id).map(|e| e.value().clone()))
    }

    async fn update(&self, pipeline: &mut Pipeline) -> Result<bool> {
        // Compare and swap under the shard lock held by get_mut.
        let Some(mut current) = self.records.get_mut(&pipeline.id) else {
            return Ok(false);
        };
        if current.version != pipeline.version {
            return Ok(false);
        }
        pipeline.version += 1;
        *current = pipeline.clone();
        Ok(true)
    }
}
