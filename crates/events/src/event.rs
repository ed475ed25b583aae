use chrono::{DateTime, Utc};

/// A fact about the marketplace: a listing was approved, points moved, a swap
/// closed. Facts are never edited or deleted; listing status, point balances,
/// and swap progress are all rebuilt by replaying them in order.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name, e.g. "listing.approved" or "points.debited".
    fn event_type(&self) -> &'static str;

    /// Schema version of the payload, bumped when the shape changes.
    fn version(&self) -> u32;

    /// When the thing happened in the marketplace: the moment the member
    /// submitted, the admin ruled, or the swap was confirmed received. This
    /// is business time; storage order is the envelope's sequence number.
    fn occurred_at(&self) -> DateTime<Utc>;
}
