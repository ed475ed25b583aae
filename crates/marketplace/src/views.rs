//! Read models projected from rehydrated aggregates.
//!
//! Views are computed on demand from the authoritative streams; nothing here
//! is cached or stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rewear_core::{DomainError, DomainResult, ListingId, SwapId, UserId};
use rewear_infra::UserProfile;
use rewear_listings::{Category, Condition, ItemImage, Listing, ListingStatus};
use rewear_swaps::{Swap, SwapKind, SwapStatus};

/// Listing read model. `approved` is derived from the status; it is never
/// stored anywhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingView {
    pub id: ListingId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub item_type: String,
    pub size: String,
    pub condition: Condition,
    pub points_value: u64,
    pub status: ListingStatus,
    pub approved: bool,
    pub images: Vec<ItemImage>,
    pub tags: Vec<String>,
    pub active_swap: Option<SwapId>,
    pub created_at: DateTime<Utc>,
}

impl ListingView {
    pub(crate) fn project(listing: &Listing) -> DomainResult<Self> {
        let (owner, details, created_at) =
            match (listing.owner(), listing.details(), listing.created_at()) {
                (Some(o), Some(d), Some(c)) => (o, d, c),
                _ => return Err(DomainError::internal("created listing missing submission data")),
            };

        Ok(Self {
            id: listing.id_typed(),
            owner,
            title: details.title.clone(),
            description: details.description.clone(),
            category: details.category,
            item_type: details.item_type.clone(),
            size: details.size.clone(),
            condition: details.condition,
            points_value: listing.points_value(),
            status: listing.status(),
            approved: listing.has_been_approved(),
            images: listing.images().to_vec(),
            tags: listing.tags().as_slice().to_vec(),
            active_swap: listing.active_swap(),
            created_at,
        })
    }
}

/// Swap read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapView {
    pub id: SwapId,
    pub requester: UserId,
    pub owner: UserId,
    pub listing_id: ListingId,
    pub kind: SwapKind,
    pub status: SwapStatus,
    pub points_value: u64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SwapView {
    pub(crate) fn project(swap: &Swap) -> DomainResult<Self> {
        let (requester, owner, listing_id, kind, created_at) = match (
            swap.requester(),
            swap.owner(),
            swap.listing_id(),
            swap.kind(),
            swap.created_at(),
        ) {
            (Some(r), Some(o), Some(l), Some(k), Some(c)) => (r, o, l, k, c),
            _ => return Err(DomainError::internal("created swap missing open data")),
        };

        Ok(Self {
            id: swap.id_typed(),
            requester,
            owner,
            listing_id,
            kind,
            status: swap.status(),
            points_value: swap.points_value(),
            created_at,
            completed_at: swap.completed_at(),
        })
    }
}

/// Moderation stats. Counts are recomputed from authoritative state on every
/// call; the "today" figures come from audit trail timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub pending: u64,
    pub approved_today: u64,
    pub flagged: u64,
    pub rejected_today: u64,
}

/// Per-user dashboard figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub points_balance: u64,
    pub items_listed: u64,
    pub ongoing_swaps: u64,
    pub completed_swaps: u64,
    pub impact_score: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub user: UserProfile,
    pub stats: UserStats,
    pub items: Vec<ListingView>,
    pub ongoing_swaps: Vec<SwapView>,
    pub completed_swaps: Vec<SwapView>,
}

/// Community impact score, capped at 100.
pub fn impact_score(completed_swaps: u64, items_listed: u64) -> u64 {
    (completed_swaps * 5 + items_listed * 2).min(100)
}
