//! Append-only event store boundary.
//!
//! Defines the storage abstraction for aggregate event streams without making
//! storage assumptions; the in-memory backend is the reference implementation.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StreamAppend, UncommittedEvent};
