//! Points ledger.
//!
//! One `PointsAccount` aggregate per user. The event stream is the ledger:
//! an append-only sequence of signed deltas, with the in-memory balance a
//! projection rebuilt by replay.

pub mod account;

pub use account::{
    CreditPoints, CreditSource, DebitPoints, DebitReason, PointsAccount, PointsCommand,
    PointsCredited, PointsDebited, PointsEvent,
};
