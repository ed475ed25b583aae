use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use rewear_core::ExpectedVersion;
use rewear_events::EventEnvelope;

/// An event ready to be appended to a stream, before a sequence number has
/// been assigned. The store assigns sequence numbers during append and hands
/// back [`EventEnvelope`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: chrono::DateTime<chrono::Utc>,

    pub payload: JsonValue,
}

impl UncommittedEvent {
    /// Build an uncommitted event from a typed domain event.
    ///
    /// Serializes the payload to JSON and captures the event metadata needed
    /// to deserialize it again during rehydration.
    pub fn from_typed<E>(
        aggregate_type: impl Into<String>,
        aggregate_id: u64,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: rewear_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::InvalidAppend(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id: Uuid::now_v7(),
            aggregate_type: aggregate_type.into(),
            aggregate_id,
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// Event store operation error. Infrastructure failures only; domain errors
/// never originate here.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Optimistic concurrency check failed (stream version moved).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// Lock poisoning or other storage failure.
    #[error("event store internal error: {0}")]
    Internal(String),
}

/// One stream's contribution to a transactional append.
#[derive(Debug, Clone)]
pub struct StreamAppend {
    pub events: Vec<UncommittedEvent>,
    pub expected_version: ExpectedVersion,
}

impl StreamAppend {
    pub fn new(events: Vec<UncommittedEvent>, expected_version: ExpectedVersion) -> Self {
        Self {
            events,
            expected_version,
        }
    }
}

/// Append-only event store.
///
/// Streams are keyed by `(aggregate_type, aggregate_id)`; within a stream,
/// sequence numbers are monotonically increasing starting at 1. Optimistic
/// concurrency is enforced via [`ExpectedVersion`] checked under the write
/// lock, so a stale writer loses the race instead of overwriting.
pub trait EventStore: Send + Sync {
    /// Append events to a single aggregate stream.
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<EventEnvelope<JsonValue>>, EventStoreError>;

    /// Append to several streams as one atomic unit.
    ///
    /// Every stream's expected version is validated before any event is
    /// written; either all appends land or none do. This is the transactional
    /// boundary for cross-aggregate operations (moderation approval, swap
    /// completion).
    fn append_transactional(
        &self,
        appends: Vec<StreamAppend>,
    ) -> Result<Vec<EventEnvelope<JsonValue>>, EventStoreError>;

    /// Load the full stream for an aggregate, in sequence number order.
    /// Returns an empty vector for a stream that does not exist yet.
    fn load_stream(
        &self,
        aggregate_type: &str,
        aggregate_id: u64,
    ) -> Result<Vec<EventEnvelope<JsonValue>>, EventStoreError>;

    /// All aggregate ids with at least one event of the given type, ascending.
    fn stream_ids(&self, aggregate_type: &str) -> Result<Vec<u64>, EventStoreError>;
}
