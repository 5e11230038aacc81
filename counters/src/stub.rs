use crate::{CounterError, RedeliveryCounter};
use async_trait::async_trait;

/// Tracks nothing; every message reports as never-before-redelivered.
/// Useful when redelivery policy is handled entirely by the broker's
/// own dead-lettering rather than application-level counting.
pub struct StubCounter;

#[async_trait]
impl RedeliveryCounter for StubCounter {
    async fn increment(&self, _message_id: &str) -> Result<u32, CounterError> {
        Ok(0)
    }

    async fn reset(&self, _message_id: &str) -> Result<(), CounterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_reports_zero() {
        let counter = StubCounter;
        assert_eq!(counter.increment("m1").await.unwrap(), 0);
        assert_eq!(counter.increment("m1").await.unwrap(), 0);
    }
}
