//! Swap workflow orchestration.
//!
//! Opening a swap reserves the listing in the same atomic append that creates
//! the swap, which is how "at most one active swap per listing" holds under
//! concurrency. Completion settles everything at once: swap, listing, and for
//! point redemptions the requester debit and owner credit.

use rewear_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, ExpectedVersion, ListingId, SwapId,
    UserId,
};
use rewear_infra::{EventStore, dispatcher};
use rewear_ledger::{
    CreditPoints, CreditSource, DebitPoints, DebitReason, PointsAccount, PointsCommand,
};
use rewear_listings::{
    Listing, ListingCommand, MarkListingSwapped, ReleaseListing, ReserveListing,
};
use rewear_swaps::{
    ApproveSwap, CompleteSwap, MarkSwapInTransit, OpenSwap, RejectSwap, Swap, SwapCommand,
    SwapEvent, SwapKind,
};

use crate::views::SwapView;
use crate::{LISTING_STREAM, Marketplace, POINTS_STREAM, SWAP_STREAM};

impl Marketplace {
    /// Request a swap against an available listing.
    ///
    /// For point redemptions the requester's balance must already cover the
    /// listing's points value; it is checked again atomically at completion.
    pub fn open_swap(
        &self,
        requester: UserId,
        listing_id: ListingId,
        kind: SwapKind,
    ) -> DomainResult<SwapView> {
        self.users().require(requester)?;

        let now = self.now();
        let listing = self.load_listing(listing_id)?;
        let owner = listing
            .owner()
            .ok_or_else(|| DomainError::internal("created listing without owner"))?;
        let points_value = listing.points_value();

        if kind == SwapKind::PointRedemption {
            let account = self.load_account(requester)?;
            if account.balance() < points_value {
                return Err(DomainError::InsufficientBalance {
                    balance: account.balance(),
                    requested: points_value,
                });
            }
        }

        let swap_id = SwapId::new(self.next_swap_id());
        let reserve_cmd = ListingCommand::Reserve(ReserveListing {
            listing_id,
            swap_id,
            requester,
            occurred_at: now,
        });
        let reserve_events = listing.handle(&reserve_cmd)?;

        let swap = Swap::empty(swap_id);
        let open_events = swap.handle(&SwapCommand::Open(OpenSwap {
            swap_id,
            requester,
            owner,
            listing_id,
            kind,
            points_value,
            occurred_at: now,
        }))?;

        let appended = self.store().append_transactional(vec![
            dispatcher::stream_append(
                LISTING_STREAM,
                listing_id.get(),
                &reserve_events,
                ExpectedVersion::Exact(listing.version()),
            )?,
            dispatcher::stream_append(SWAP_STREAM, swap_id.get(), &open_events, ExpectedVersion::Exact(0))?,
        ]);

        if let Err(err) = appended {
            return match dispatcher::store_error(err) {
                DomainError::Conflict(msg) => {
                    // A racing writer beat us to the listing; classify.
                    let listing = self.load_listing(listing_id)?;
                    listing.handle(&reserve_cmd)?;
                    Err(DomainError::conflict(msg))
                }
                other => Err(other),
            };
        }

        tracing::info!(swap_id = %swap_id, listing_id = %listing_id, requester = %requester, "swap opened");
        self.swap(swap_id)
    }

    /// Listing owner accepts the request.
    pub fn approve_swap(&self, swap_id: SwapId, actor: UserId) -> DomainResult<SwapView> {
        self.users().require(actor)?;
        let cmd = SwapCommand::Approve(ApproveSwap {
            swap_id,
            actor,
            occurred_at: self.now(),
        });
        dispatcher::execute_classified(self.store(), SWAP_STREAM, swap_id.get(), &cmd, || {
            Swap::empty(swap_id)
        })?;
        self.swap(swap_id)
    }

    /// Owner declines, or the requester cancels a pending request. Releases
    /// the listing reservation in the same atomic append.
    pub fn reject_swap(&self, swap_id: SwapId, actor: UserId) -> DomainResult<SwapView> {
        self.users().require(actor)?;

        let now = self.now();
        let swap = self.load_swap(swap_id)?;
        let reject_cmd = SwapCommand::Reject(RejectSwap {
            swap_id,
            actor,
            occurred_at: now,
        });
        let reject_events = swap.handle(&reject_cmd)?;

        let listing_id = swap
            .listing_id()
            .ok_or_else(|| DomainError::internal("created swap missing listing"))?;
        let listing = self.load_listing(listing_id)?;

        let mut appends = vec![dispatcher::stream_append(
            SWAP_STREAM,
            swap_id.get(),
            &reject_events,
            ExpectedVersion::Exact(swap.version()),
        )?];

        // An admin may have already removed the listing, which drops the
        // reservation; only release when this swap still holds it.
        if listing.active_swap() == Some(swap_id) {
            let release_events = listing.handle(&ListingCommand::Release(ReleaseListing {
                listing_id,
                swap_id,
                occurred_at: now,
            }))?;
            appends.push(dispatcher::stream_append(
                LISTING_STREAM,
                listing_id.get(),
                &release_events,
                ExpectedVersion::Exact(listing.version()),
            )?);
        }

        if let Err(err) = self.store().append_transactional(appends) {
            return match dispatcher::store_error(err) {
                DomainError::Conflict(msg) => {
                    let swap = self.load_swap(swap_id)?;
                    swap.handle(&reject_cmd)?;
                    Err(DomainError::conflict(msg))
                }
                other => Err(other),
            };
        }

        self.swap(swap_id)
    }

    /// Owner marks the item shipped.
    pub fn mark_in_transit(&self, swap_id: SwapId, actor: UserId) -> DomainResult<SwapView> {
        self.users().require(actor)?;
        let cmd = SwapCommand::MarkInTransit(MarkSwapInTransit {
            swap_id,
            actor,
            occurred_at: self.now(),
        });
        dispatcher::execute_classified(self.store(), SWAP_STREAM, swap_id.get(), &cmd, || {
            Swap::empty(swap_id)
        })?;
        self.swap(swap_id)
    }

    /// Confirm receipt and settle.
    ///
    /// One atomic append covers the swap completion, the listing's transition
    /// to Swapped, and for point redemptions the requester's debit and the
    /// owner's credit. An insufficient balance fails the whole settlement.
    pub fn complete_swap(&self, swap_id: SwapId, actor: UserId) -> DomainResult<SwapView> {
        self.users().require(actor)?;

        let now = self.now();
        let swap = self.load_swap(swap_id)?;
        let complete_cmd = SwapCommand::Complete(CompleteSwap {
            swap_id,
            actor,
            occurred_at: now,
        });
        let swap_events = swap.handle(&complete_cmd)?;

        let settlement = match swap_events.first() {
            Some(SwapEvent::Completed(e)) => e.clone(),
            _ => return Err(DomainError::internal("complete produced no completion event")),
        };

        let listing = self.load_listing(settlement.listing_id)?;
        let mark_cmd = ListingCommand::MarkSwapped(MarkListingSwapped {
            listing_id: settlement.listing_id,
            swap_id,
            occurred_at: now,
        });
        let listing_events = listing.handle(&mark_cmd)?;

        let mut appends = vec![
            dispatcher::stream_append(
                SWAP_STREAM,
                swap_id.get(),
                &swap_events,
                ExpectedVersion::Exact(swap.version()),
            )?,
            dispatcher::stream_append(
                LISTING_STREAM,
                settlement.listing_id.get(),
                &listing_events,
                ExpectedVersion::Exact(listing.version()),
            )?,
        ];

        if settlement.kind == SwapKind::PointRedemption {
            let requester_account = self.load_account(settlement.requester)?;
            let debit_events = requester_account.handle(&PointsCommand::Debit(DebitPoints {
                user_id: settlement.requester,
                amount: settlement.points_value,
                reason: DebitReason::Redemption { swap_id },
                occurred_at: now,
            }))?;

            let owner_account = self.load_account(settlement.owner)?;
            let credit_events = owner_account.handle(&PointsCommand::Credit(CreditPoints {
                user_id: settlement.owner,
                amount: settlement.points_value,
                source: CreditSource::SwapIncome { swap_id },
                occurred_at: now,
            }))?;

            appends.push(dispatcher::stream_append(
                POINTS_STREAM,
                settlement.requester.get(),
                &debit_events,
                ExpectedVersion::Exact(requester_account.version()),
            )?);
            appends.push(dispatcher::stream_append(
                POINTS_STREAM,
                settlement.owner.get(),
                &credit_events,
                ExpectedVersion::Exact(owner_account.version()),
            )?);
        }

        if let Err(err) = self.store().append_transactional(appends) {
            return match dispatcher::store_error(err) {
                DomainError::Conflict(msg) => {
                    let swap = self.load_swap(swap_id)?;
                    swap.handle(&complete_cmd)?;
                    let listing = self.load_listing(settlement.listing_id)?;
                    listing.handle(&mark_cmd)?;
                    Err(DomainError::conflict(msg))
                }
                other => Err(other),
            };
        }

        tracing::info!(swap_id = %swap_id, kind = ?settlement.kind, "swap completed");
        self.swap(swap_id)
    }

    pub(crate) fn load_swap(&self, swap_id: SwapId) -> DomainResult<Swap> {
        let swap: Swap = dispatcher::rehydrate(self.store(), SWAP_STREAM, swap_id.get(), || {
            Swap::empty(swap_id)
        })?;
        if !swap.exists() {
            return Err(DomainError::NotFound);
        }
        Ok(swap)
    }

    pub(crate) fn load_account(&self, user_id: UserId) -> DomainResult<PointsAccount> {
        dispatcher::rehydrate(self.store(), POINTS_STREAM, user_id.get(), || {
            PointsAccount::empty(user_id)
        })
    }
}
