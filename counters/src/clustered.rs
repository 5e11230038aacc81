use crate::{CounterError, RedeliveryCounter};
use async_trait::async_trait;

/// Placeholder for a cluster-aware counter backend (e.g. shared Redis
/// or broker-side counting). Out of scope per spec; the registry slot
/// and error exist so the interface surface is complete.
pub struct ClusteredCounter;

#[async_trait]
impl RedeliveryCounter for ClusteredCounter {
    async fn increment(&self, _message_id: &str) -> Result<u32, CounterError> {
        Err(CounterError::Unsupported("clustered".to_string()))
    }

    async fn reset(&self, _message_id: &str) -> Result<(), CounterError> {
        Err(CounterError::Unsupported("clustered".to_string()))
    }
}
