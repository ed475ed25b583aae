//! `rewear-listings` — the item lifecycle engine.
//!
//! A `Listing` is a garment entry moving through
//! draft → pending → available/rejected → swapped, with flagging and removal
//! as moderation detours. The aggregate enforces the transition table; the
//! business consequences of a transition (ledger credits, audit records) are
//! orchestrated one layer up.

pub mod listing;
pub mod media;
pub mod valuation;

pub use listing::{
    ApproveListing, ClearListingFlag, FlagListing, Listing, ListingCommand, ListingDetails,
    ListingEvent, ListingStatus, MarkListingSwapped, RejectListing, ReleaseListing, RemoveListing,
    ReportSource, ReserveListing, SendForReview, SubmitListing,
};
pub use media::{ItemImage, TagSet, image_set};
pub use valuation::{Category, Condition, points_value};
