//! `rewear-marketplace` — the application layer.
//!
//! Wires the event store, user directory, and audit log behind one facade.
//! Commands flow through the aggregates' pure `handle`; cross-aggregate
//! operations (moderation approval, swap settlement) go through a single
//! transactional append so no partial state can escape. Queries rehydrate
//! from the authoritative streams on every call.

pub mod moderation;
pub mod query;
pub mod submission;
pub mod swaps;
pub mod views;

pub use moderation::ModerationAction;
pub use submission::SubmissionReceipt;
pub use views::{Dashboard, ListingView, Stats, SwapView, UserStats, impact_score};

use chrono::{DateTime, Utc};

use rewear_core::{DomainResult, UserId};
use rewear_infra::{AuditLog, IdSequence, InMemoryEventStore, Role, UserDirectory, UserProfile};

/// Stream type for listing aggregates.
pub(crate) const LISTING_STREAM: &str = "listing";
/// Stream type for per-user points accounts.
pub(crate) const POINTS_STREAM: &str = "points";
/// Stream type for swap aggregates.
pub(crate) const SWAP_STREAM: &str = "swap";

/// Marketplace facade.
pub struct Marketplace {
    store: InMemoryEventStore,
    users: UserDirectory,
    audit: AuditLog,
    listing_ids: IdSequence,
    swap_ids: IdSequence,
}

impl Marketplace {
    pub fn new() -> Self {
        Self {
            store: InMemoryEventStore::new(),
            users: UserDirectory::new(),
            audit: AuditLog::new(),
            listing_ids: IdSequence::new(),
            swap_ids: IdSequence::new(),
        }
    }

    pub fn register_member(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        location: Option<String>,
    ) -> DomainResult<UserProfile> {
        self.users
            .register(name, email, location, Role::Member, self.now())
    }

    pub fn register_admin(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        location: Option<String>,
    ) -> DomainResult<UserProfile> {
        self.users
            .register(name, email, location, Role::Admin, self.now())
    }

    pub fn user(&self, user_id: UserId) -> DomainResult<UserProfile> {
        self.users.require(user_id)
    }

    pub(crate) fn store(&self) -> &InMemoryEventStore {
        &self.store
    }

    pub(crate) fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub(crate) fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub(crate) fn next_listing_id(&self) -> u64 {
        self.listing_ids.next()
    }

    pub(crate) fn next_swap_id(&self) -> u64 {
        self.swap_ids.next()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new()
    }
}
