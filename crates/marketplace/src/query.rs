//! Query layer.
//!
//! No cached read models: every query loads the authoritative streams and
//! rehydrates, so a view can never disagree with the state a command would
//! see. Fine for the in-memory backend; a projection layer can slot in later
//! without changing any signature.

use rewear_core::{DomainError, DomainResult, ListingId, SwapId, UserId};
use rewear_infra::{AdminActionKind, AdminActionRecord, EventStore, dispatcher};
use rewear_listings::{Listing, ListingStatus};
use rewear_swaps::Swap;

use crate::views::{Dashboard, ListingView, Stats, SwapView, UserStats, impact_score};
use crate::{LISTING_STREAM, Marketplace, SWAP_STREAM};

/// Completed swaps shown on the dashboard (and feeding the impact score).
const DASHBOARD_COMPLETED_LIMIT: usize = 5;

impl Marketplace {
    pub(crate) fn load_listing(&self, listing_id: ListingId) -> DomainResult<Listing> {
        let listing: Listing =
            dispatcher::rehydrate(self.store(), LISTING_STREAM, listing_id.get(), || {
                Listing::empty(listing_id)
            })?;
        if !listing.exists() {
            return Err(DomainError::NotFound);
        }
        Ok(listing)
    }

    pub fn listing(&self, listing_id: ListingId) -> DomainResult<ListingView> {
        ListingView::project(&self.load_listing(listing_id)?)
    }

    pub fn swap(&self, swap_id: SwapId) -> DomainResult<SwapView> {
        SwapView::project(&self.load_swap(swap_id)?)
    }

    pub fn user_balance(&self, user_id: UserId) -> DomainResult<u64> {
        self.users().require(user_id)?;
        Ok(self.load_account(user_id)?.balance())
    }

    /// Moderation stats. `pending` and `flagged` are current counts;
    /// `approved_today` and `rejected_today` come from the audit trail's
    /// timestamps, since "approved" is a past event, not a stored status.
    pub fn stats(&self) -> DomainResult<Stats> {
        let now = self.now();
        let mut pending = 0u64;
        let mut flagged = 0u64;

        for listing in self.all_listings()? {
            match listing.status() {
                ListingStatus::Pending => pending += 1,
                ListingStatus::Flagged => flagged += 1,
                _ => {}
            }
        }

        Ok(Stats {
            pending,
            approved_today: self.audit().count_today(AdminActionKind::Approved, now)?,
            flagged,
            rejected_today: self.audit().count_today(AdminActionKind::Rejected, now)?,
        })
    }

    /// Listings in one status, newest first.
    pub fn list_by_status(
        &self,
        status: ListingStatus,
        limit: usize,
        offset: usize,
    ) -> DomainResult<Vec<ListingView>> {
        let mut listings: Vec<Listing> = self
            .all_listings()?
            .into_iter()
            .filter(|l| l.status() == status)
            .collect();
        Self::sort_newest_first(&mut listings);

        listings
            .iter()
            .skip(offset)
            .take(limit)
            .map(ListingView::project)
            .collect()
    }

    /// The public browse feed: available listings, newest first.
    pub fn browse_available(&self) -> DomainResult<Vec<ListingView>> {
        let mut listings: Vec<Listing> = self
            .all_listings()?
            .into_iter()
            .filter(|l| l.status() == ListingStatus::Available)
            .collect();
        Self::sort_newest_first(&mut listings);

        listings.iter().map(ListingView::project).collect()
    }

    /// Recent admin actions, newest first.
    pub fn recent_actions(
        &self,
        limit: usize,
        offset: usize,
    ) -> DomainResult<Vec<AdminActionRecord>> {
        self.audit().list_recent(limit, offset)
    }

    /// Everything a member's dashboard shows: their listings, ongoing and
    /// recently completed swaps, balance, and impact score.
    pub fn dashboard(&self, user_id: UserId) -> DomainResult<Dashboard> {
        let user = self.users().require(user_id)?;

        let mut items: Vec<Listing> = self
            .all_listings()?
            .into_iter()
            .filter(|l| l.owner() == Some(user_id))
            .collect();
        Self::sort_newest_first(&mut items);
        let items = items
            .iter()
            .map(ListingView::project)
            .collect::<DomainResult<Vec<_>>>()?;

        let mut ongoing = Vec::new();
        let mut completed = Vec::new();
        for swap in self.all_swaps()? {
            if swap.requester() != Some(user_id) && swap.owner() != Some(user_id) {
                continue;
            }
            let view = SwapView::project(&swap)?;
            if view.status == rewear_swaps::SwapStatus::Completed {
                completed.push(view);
            } else if !view.status.is_terminal() {
                ongoing.push(view);
            }
        }
        completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        completed.truncate(DASHBOARD_COMPLETED_LIMIT);
        ongoing.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let stats = UserStats {
            points_balance: self.load_account(user_id)?.balance(),
            items_listed: items.len() as u64,
            ongoing_swaps: ongoing.len() as u64,
            completed_swaps: completed.len() as u64,
            impact_score: impact_score(completed.len() as u64, items.len() as u64),
        };

        Ok(Dashboard {
            user,
            stats,
            items,
            ongoing_swaps: ongoing,
            completed_swaps: completed,
        })
    }

    fn all_listings(&self) -> DomainResult<Vec<Listing>> {
        let ids = self
            .store()
            .stream_ids(LISTING_STREAM)
            .map_err(dispatcher::store_error)?;

        ids.into_iter()
            .map(|raw| {
                let id = ListingId::new(raw);
                dispatcher::rehydrate(self.store(), LISTING_STREAM, raw, || Listing::empty(id))
            })
            .collect()
    }

    fn all_swaps(&self) -> DomainResult<Vec<Swap>> {
        let ids = self
            .store()
            .stream_ids(SWAP_STREAM)
            .map_err(dispatcher::store_error)?;

        ids.into_iter()
            .map(|raw| {
                let id = SwapId::new(raw);
                dispatcher::rehydrate(self.store(), SWAP_STREAM, raw, || Swap::empty(id))
            })
            .collect()
    }

    fn sort_newest_first(listings: &mut [Listing]) {
        listings.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id_typed().get().cmp(&a.id_typed().get()))
        });
    }
}
