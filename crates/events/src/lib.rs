//! Domain events: the append-only facts every read model is derived from.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
