use crate::{CounterError, RedeliveryCounter};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// An in-process, non-clustered redelivery counter. Bounded by `size`:
/// once the tracked-message count would exceed it, the oldest entry
/// (by insertion) is evicted to make room, trading perfect accounting
/// under memory pressure for a hard cap on memory use.
pub struct InMemoryCounter {
    size: usize,
    counts: Mutex<HashMap<String, u32>>,
    order: Mutex<Vec<String>>,
}

impl InMemoryCounter {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            counts: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RedeliveryCounter for InMemoryCounter {
    async fn increment(&self, message_id: &str) -> Result<u32, CounterError> {
        let mut counts = self.counts.lock().await;
        if !counts.contains_key(message_id) {
            let mut order = self.order.lock().await;
            if order.len() >= self.size {
                if let Some(oldest) = order.first().cloned() {
                    order.remove(0);
                    counts.remove(&oldest);
                }
            }
            order.push(message_id.to_string());
        }
        let count = counts.entry(message_id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn reset(&self, message_id: &str) -> Result<(), CounterError> {
        self.counts.lock().await.remove(message_id);
        self.order.lock().await.retain(|id| id != message_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increments_per_message() {
        let counter = InMemoryCounter::new(10);
        assert_eq!(counter.increment("m1").await.unwrap(), 1);
        assert_eq!(counter.increment("m2").await.unwrap(), 1);
        assert_eq!(counter.increment("m1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn evicts_oldest_once_size_is_exceeded() {
        let counter = InMemoryCounter::new(1);
        counter.increment("m1").await.unwrap();
        counter.increment("m2").await.unwrap();
        assert_eq!(counter.increment("m1").await.unwrap(), 1);
    }
}
