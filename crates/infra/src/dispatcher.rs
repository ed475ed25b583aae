//! Command execution pipeline.
//!
//! One pipeline for every aggregate: load the stream, rehydrate by replay,
//! run the pure `handle`, append the decided events with an exact version
//! check. Mutations are never retried; a losing writer surfaces a conflict
//! (or, via [`execute_classified`], the domain error the winner left behind).

use serde::Serialize;
use serde::de::DeserializeOwned;

use rewear_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion};
use rewear_events::Event;

use crate::event_store::{EventStore, EventStoreError, StreamAppend, UncommittedEvent};

/// Map infrastructure failures into the domain taxonomy at the boundary.
pub fn store_error(err: EventStoreError) -> DomainError {
    match err {
        EventStoreError::Concurrency(msg) => DomainError::conflict(msg),
        other => DomainError::internal(other.to_string()),
    }
}

/// Serialize typed events into an uncommitted batch for one stream.
pub fn to_uncommitted<E>(
    aggregate_type: &str,
    aggregate_id: u64,
    events: &[E],
) -> Result<Vec<UncommittedEvent>, DomainError>
where
    E: Event + Serialize,
{
    events
        .iter()
        .map(|ev| UncommittedEvent::from_typed(aggregate_type, aggregate_id, ev))
        .collect::<Result<Vec<_>, _>>()
        .map_err(store_error)
}

/// Build one stream's contribution to a transactional append.
pub fn stream_append<E>(
    aggregate_type: &str,
    aggregate_id: u64,
    events: &[E],
    expected_version: ExpectedVersion,
) -> Result<StreamAppend, DomainError>
where
    E: Event + Serialize,
{
    Ok(StreamAppend::new(
        to_uncommitted(aggregate_type, aggregate_id, events)?,
        expected_version,
    ))
}

/// Rebuild an aggregate by replaying its stream.
pub fn rehydrate<A>(
    store: &impl EventStore,
    aggregate_type: &str,
    aggregate_id: u64,
    make: impl FnOnce() -> A,
) -> Result<A, DomainError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    let history = store
        .load_stream(aggregate_type, aggregate_id)
        .map_err(store_error)?;

    let mut aggregate = make();
    for envelope in history {
        let ev: A::Event = serde_json::from_value(envelope.into_payload())
            .map_err(|e| DomainError::internal(format!("event deserialization failed: {e}")))?;
        aggregate.apply(&ev);
    }

    Ok(aggregate)
}

/// Run a command against a single aggregate stream.
///
/// Returns the decided typed events after they are durably appended, so the
/// caller can project receipts without a re-read.
pub fn execute<A>(
    store: &impl EventStore,
    aggregate_type: &str,
    aggregate_id: u64,
    command: &A::Command,
    make: impl FnOnce() -> A,
) -> Result<Vec<A::Event>, DomainError>
where
    A: Aggregate<Error = DomainError> + AggregateRoot,
    A::Event: Event + Serialize + DeserializeOwned,
{
    let aggregate = rehydrate(store, aggregate_type, aggregate_id, make)?;
    let expected = ExpectedVersion::Exact(aggregate.version());

    let decided = aggregate.handle(command)?;
    if decided.is_empty() {
        return Ok(decided);
    }

    let uncommitted = to_uncommitted(aggregate_type, aggregate_id, &decided)?;
    store.append(uncommitted, expected).map_err(store_error)?;

    tracing::debug!(
        aggregate_type,
        aggregate_id,
        events = decided.len(),
        "command applied"
    );

    Ok(decided)
}

/// Like [`execute`], but on a lost append race the stream is reloaded and the
/// pure `handle` re-run once, purely to classify the failure: a racing writer
/// that changed the lifecycle state turns the raw conflict into the domain
/// error callers can act on (typically `InvalidTransition`). The command is
/// never re-appended.
pub fn execute_classified<A>(
    store: &impl EventStore,
    aggregate_type: &str,
    aggregate_id: u64,
    command: &A::Command,
    make: impl Fn() -> A,
) -> Result<Vec<A::Event>, DomainError>
where
    A: Aggregate<Error = DomainError> + AggregateRoot,
    A::Event: Event + Serialize + DeserializeOwned,
{
    match execute(store, aggregate_type, aggregate_id, command, &make) {
        Err(DomainError::Conflict(msg)) => {
            let aggregate = rehydrate(store, aggregate_type, aggregate_id, &make)?;
            match aggregate.handle(command) {
                Err(domain_err) => Err(domain_err),
                // Still legal against the new state; surface the conflict and
                // let the caller decide whether to resubmit.
                Ok(_) => Err(DomainError::Conflict(msg)),
            }
        }
        other => other,
    }
}
