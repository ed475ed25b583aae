//! Infrastructure layer: event storage, command dispatch, identity, audit.

pub mod audit;
pub mod dispatcher;
pub mod event_store;
pub mod ids;
pub mod users;

pub use audit::{AdminActionKind, AdminActionRecord, AuditLog};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StreamAppend, UncommittedEvent};
pub use ids::IdSequence;
pub use users::{Role, UserDirectory, UserProfile};
