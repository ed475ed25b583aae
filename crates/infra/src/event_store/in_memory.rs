use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use rewear_core::ExpectedVersion;
use rewear_events::EventEnvelope;

use super::r#trait::{EventStore, EventStoreError, StreamAppend, UncommittedEvent};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    aggregate_type: String,
    aggregate_id: u64,
}

/// In-memory append-only event store.
///
/// The reference backend: a `RwLock` over per-stream vectors. The write lock
/// doubles as the transaction boundary for multi-stream appends.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<EventEnvelope<JsonValue>>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[EventEnvelope<JsonValue>]) -> u64 {
        stream.last().map(|e| e.sequence_number()).unwrap_or(0)
    }

    /// Validate that every event in a batch targets the same stream and
    /// return its key.
    fn batch_key(events: &[UncommittedEvent]) -> Result<StreamKey, EventStoreError> {
        let aggregate_type = events[0].aggregate_type.clone();
        let aggregate_id = events[0].aggregate_id;

        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        Ok(StreamKey {
            aggregate_type,
            aggregate_id,
        })
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<EventEnvelope<JsonValue>>, EventStoreError> {
        self.append_transactional(vec![StreamAppend::new(events, expected_version)])
    }

    fn append_transactional(
        &self,
        appends: Vec<StreamAppend>,
    ) -> Result<Vec<EventEnvelope<JsonValue>>, EventStoreError> {
        let appends: Vec<StreamAppend> = appends
            .into_iter()
            .filter(|a| !a.events.is_empty())
            .collect();
        if appends.is_empty() {
            return Ok(vec![]);
        }

        let keys = appends
            .iter()
            .map(|a| Self::batch_key(&a.events))
            .collect::<Result<Vec<_>, _>>()?;

        // One stream per append; a transaction never targets a stream twice.
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(EventStoreError::InvalidAppend(format!(
                    "transaction targets stream '{}/{}' more than once",
                    key.aggregate_type, key.aggregate_id
                )));
            }
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::Internal("lock poisoned".to_string()))?;

        // Validate every stream's expected version before writing anything,
        // so either all appends land or none do.
        for (append, key) in appends.iter().zip(&keys) {
            let current = streams
                .get(key)
                .map(|s| Self::current_version(s))
                .unwrap_or(0);
            if !append.expected_version.matches(current) {
                return Err(EventStoreError::Concurrency(format!(
                    "stream '{}/{}': expected {:?}, found {current}",
                    key.aggregate_type, key.aggregate_id, append.expected_version
                )));
            }
        }

        let mut committed = Vec::new();
        for (append, key) in appends.into_iter().zip(keys) {
            let stream = streams.entry(key).or_default();
            let mut next = Self::current_version(stream) + 1;
            for e in append.events {
                let envelope = EventEnvelope::new(
                    e.event_id,
                    e.aggregate_type,
                    e.aggregate_id,
                    next,
                    e.event_type,
                    e.event_version,
                    e.occurred_at,
                    e.payload,
                );
                next += 1;
                stream.push(envelope.clone());
                committed.push(envelope);
            }
        }

        Ok(committed)
    }

    fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: u64,
    ) -> Result<Vec<EventEnvelope<JsonValue>>, EventStoreError> {
        let key = StreamKey {
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
        };

        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Internal("lock poisoned".to_string()))?;

        Ok(streams.get(&key).cloned().unwrap_or_default())
    }

    fn stream_ids(&self, aggregate_type: &str) -> Result<Vec<u64>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Internal("lock poisoned".to_string()))?;

        let mut ids: Vec<u64> = streams
            .keys()
            .filter(|k| k.aggregate_type == aggregate_type)
            .map(|k| k.aggregate_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn uncommitted(aggregate_type: &str, aggregate_id: u64) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            event_type: "test.event".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({"n": 1}),
        }
    }

    #[test]
    fn append_assigns_monotonic_sequence_numbers() {
        let store = InMemoryEventStore::new();

        let first = store
            .append(vec![uncommitted("listing", 1)], ExpectedVersion::Any)
            .unwrap();
        assert_eq!(first[0].sequence_number(), 1);

        let second = store
            .append(
                vec![uncommitted("listing", 1), uncommitted("listing", 1)],
                ExpectedVersion::Exact(1),
            )
            .unwrap();
        assert_eq!(second[0].sequence_number(), 2);
        assert_eq!(second[1].sequence_number(), 3);
    }

    #[test]
    fn stale_expected_version_is_rejected() {
        let store = InMemoryEventStore::new();
        store
            .append(vec![uncommitted("listing", 1)], ExpectedVersion::Any)
            .unwrap();

        let err = store
            .append(vec![uncommitted("listing", 1)], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
    }

    #[test]
    fn transactional_append_is_all_or_nothing() {
        let store = InMemoryEventStore::new();
        store
            .append(vec![uncommitted("listing", 1)], ExpectedVersion::Any)
            .unwrap();

        // Second stream's version check fails; first stream must stay untouched.
        let err = store
            .append_transactional(vec![
                StreamAppend::new(vec![uncommitted("listing", 1)], ExpectedVersion::Exact(1)),
                StreamAppend::new(vec![uncommitted("points", 7)], ExpectedVersion::Exact(3)),
            ])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));

        assert_eq!(store.load_stream("listing", 1).unwrap().len(), 1);
        assert!(store.load_stream("points", 7).unwrap().is_empty());
    }

    #[test]
    fn transaction_rejects_duplicate_streams() {
        let store = InMemoryEventStore::new();
        let err = store
            .append_transactional(vec![
                StreamAppend::new(vec![uncommitted("listing", 1)], ExpectedVersion::Any),
                StreamAppend::new(vec![uncommitted("listing", 1)], ExpectedVersion::Any),
            ])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
    }

    #[test]
    fn stream_ids_are_scoped_by_aggregate_type() {
        let store = InMemoryEventStore::new();
        store
            .append(vec![uncommitted("listing", 2)], ExpectedVersion::Any)
            .unwrap();
        store
            .append(vec![uncommitted("listing", 1)], ExpectedVersion::Any)
            .unwrap();
        store
            .append(vec![uncommitted("swap", 9)], ExpectedVersion::Any)
            .unwrap();

        assert_eq!(store.stream_ids("listing").unwrap(), vec![1, 2]);
        assert_eq!(store.stream_ids("swap").unwrap(), vec![9]);
    }
}
