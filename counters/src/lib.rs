mod clustered;
mod error;
mod memory;
mod stub;

pub use error::CounterError;

use async_trait::async_trait;
use topology::CounterSpec;

/// A redelivery-tracking component, keyed by message identity, resolved
/// per subscription from its `Counter`'s `type` (spec.md §4.1.6). Mirrors
/// the teacher's monitor registry: a small enum dispatches to one of a
/// few concrete implementations behind a single trait object.
#[async_trait]
pub trait RedeliveryCounter: Send + Sync {
    /// Records a redelivery of `message_id` and returns the new count.
    async fn increment(&self, message_id: &str) -> Result<u32, CounterError>;

    /// Clears any tracked count for `message_id` (called once a message
    /// is finally acked).
    async fn reset(&self, message_id: &str) -> Result<(), CounterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Stub,
    InMemory,
    Clustered,
}

impl CounterKind {
    pub fn parse(type_name: &str) -> Result<Self, CounterError> {
        match type_name {
            "stub" => Ok(CounterKind::Stub),
            "inMemory" => Ok(CounterKind::InMemory),
            "clustered" => Ok(CounterKind::Clustered),
            other => Err(CounterError::UnknownType(other.to_string())),
        }
    }
}

/// Builds the concrete counter for `spec`, dispatching on `spec.kind`
/// the way `Service::exec` dispatches on `MonitorType`.
pub fn build(spec: &CounterSpec) -> Result<Box<dyn RedeliveryCounter>, CounterError> {
    match CounterKind::parse(&spec.kind)? {
        CounterKind::Stub => Ok(Box::new(stub::StubCounter)),
        CounterKind::InMemory => {
            let size = spec
                .options
                .get("size")
                .and_then(|v| v.as_u64())
                .unwrap_or(10_000) as usize;
            Ok(Box::new(memory::InMemoryCounter::new(size)))
        }
        CounterKind::Clustered => Err(CounterError::Unsupported("clustered".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_counter_type_is_rejected() {
        let err = CounterKind::parse("bogus").unwrap_err();
        assert_eq!(err, CounterError::UnknownType("bogus".to_string()));
    }

    #[test]
    fn clustered_is_a_documented_stub() {
        let spec = CounterSpec {
            name: "c1".to_string(),
            kind: "clustered".to_string(),
            options: serde_json::Map::new(),
        };
        let err = build(&spec).unwrap_err();
        assert_eq!(err, CounterError::Unsupported("clustered".to_string()));
    }

    #[tokio::test]
    async fn in_memory_counter_tracks_redeliveries() {
        let spec = CounterSpec {
            name: "c1".to_string(),
            kind: "inMemory".to_string(),
            options: json!({ "size": 10 }).as_object().unwrap().clone(),
        };
        let counter = build(&spec).unwrap();
        assert_eq!(counter.increment("m1").await.unwrap(), 1);
        assert_eq!(counter.increment("m1").await.unwrap(), 2);
        counter.reset("m1").await.unwrap();
        assert_eq!(counter.increment("m1").await.unwrap(), 1);
    }
}
