pub mod memory;

use crate::models::pipeline::Pipeline;
use crate::models::server::{RecordError, ServerRecord};
use async_trait::async_trait;
use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    UnsupportedStage(String),
    InvalidStage(String),
    Record(RecordError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedStage(stage) => write!(f, "Unsupported pipeline stage: {}", stage),
            Self::InvalidStage(reason) => write!(f, "Invalid pipeline stage: {}", reason),
            Self::Record(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<RecordError> for StoreError {
    fn from(e: RecordError) -> Self {
        Self::Record(e)
    }
}

/// Query side of the server catalog.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Number of records the pipeline yields.
    async fn count(&self, pipeline: &Pipeline) -> Result<usize, StoreError>;

    /// Record at `index` in the pipeline's output, if the slot exists.
    async fn get_at(&self, pipeline: &Pipeline, index: usize) -> Result<Option<ServerRecord>, StoreError>;
}
