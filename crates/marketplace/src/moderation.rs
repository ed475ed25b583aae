//! Moderation workflow.
//!
//! Permission is checked before any read or write (fail-closed). Every admin
//! decision appends exactly one audit record; approval additionally credits
//! the owner's points account in the same transactional append as the listing
//! transition, so a half-applied approval cannot exist.

use chrono::{DateTime, Utc};

use rewear_auth::{authorize, permission};
use rewear_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, ExpectedVersion, ListingId, UserId,
};
use rewear_infra::{AdminActionKind, EventStore, dispatcher};
use rewear_ledger::{CreditPoints, CreditSource, PointsAccount, PointsCommand};
use rewear_listings::{
    ApproveListing, ClearListingFlag, FlagListing, Listing, ListingCommand, ListingEvent,
    RejectListing, RemoveListing, ReportSource,
};

use crate::views::ListingView;
use crate::{LISTING_STREAM, Marketplace, POINTS_STREAM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
    ClearFlag,
    Remove,
}

impl Marketplace {
    /// Apply an admin decision to a listing and return the resulting view.
    pub fn moderate(
        &self,
        listing_id: ListingId,
        actor: UserId,
        action: ModerationAction,
    ) -> DomainResult<ListingView> {
        let principal = self.users().principal(actor)?;
        authorize(&principal, &permission::MODERATE_LISTINGS)
            .map_err(|_| DomainError::PermissionDenied)?;

        let now = self.now();
        match action {
            ModerationAction::Approve => self.approve_listing(listing_id, actor, now)?,
            ModerationAction::Reject => {
                let cmd = ListingCommand::Reject(RejectListing {
                    listing_id,
                    admin: actor,
                    occurred_at: now,
                });
                self.run_listing_command(listing_id, &cmd)?;
                self.audit()
                    .append(AdminActionKind::Rejected, actor, listing_id, now)?;
            }
            ModerationAction::ClearFlag => {
                let cmd = ListingCommand::ClearFlag(ClearListingFlag {
                    listing_id,
                    admin: actor,
                    occurred_at: now,
                });
                self.run_listing_command(listing_id, &cmd)?;
                self.audit()
                    .append(AdminActionKind::ClearedFlag, actor, listing_id, now)?;
            }
            ModerationAction::Remove => {
                let cmd = ListingCommand::Remove(RemoveListing {
                    listing_id,
                    admin: actor,
                    occurred_at: now,
                });
                self.run_listing_command(listing_id, &cmd)?;
                self.audit()
                    .append(AdminActionKind::Removed, actor, listing_id, now)?;
            }
        }

        self.listing(listing_id)
    }

    /// File a community or auto-detection report against an available
    /// listing. Not an admin action; it never reaches the audit trail.
    pub fn file_report(
        &self,
        listing_id: ListingId,
        reason: impl Into<String>,
        source: ReportSource,
    ) -> DomainResult<()> {
        if let ReportSource::User(reporter) = source {
            self.users().require(reporter)?;
        }

        let cmd = ListingCommand::Flag(FlagListing {
            listing_id,
            reason: reason.into(),
            source,
            occurred_at: self.now(),
        });
        self.run_listing_command(listing_id, &cmd)?;
        Ok(())
    }

    fn run_listing_command(
        &self,
        listing_id: ListingId,
        cmd: &ListingCommand,
    ) -> DomainResult<Vec<ListingEvent>> {
        dispatcher::execute_classified(self.store(), LISTING_STREAM, listing_id.get(), cmd, || {
            Listing::empty(listing_id)
        })
    }

    /// Approve = listing transition + owner credit, one atomic append.
    fn approve_listing(
        &self,
        listing_id: ListingId,
        admin: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let cmd = ListingCommand::Approve(ApproveListing {
            listing_id,
            admin,
            occurred_at: now,
        });

        match self.try_approve(listing_id, &cmd) {
            Ok(()) => {
                self.audit()
                    .append(AdminActionKind::Approved, admin, listing_id, now)?;
                tracing::info!(listing_id = %listing_id, admin = %admin, "listing approved");
                Ok(())
            }
            Err(DomainError::Conflict(msg)) => {
                // Lost the append race. Re-run the pure handle against the
                // winner's state to classify, never to re-append.
                let listing = self.load_listing(listing_id)?;
                listing.handle(&cmd)?;
                Err(DomainError::Conflict(msg))
            }
            Err(other) => Err(other),
        }
    }

    fn try_approve(&self, listing_id: ListingId, cmd: &ListingCommand) -> DomainResult<()> {
        let listing = self.load_listing(listing_id)?;
        let listing_events = listing.handle(cmd)?;

        let (owner, points_value, occurred_at) = match listing_events.first() {
            Some(ListingEvent::Approved(e)) => (e.owner, e.points_value, e.occurred_at),
            _ => return Err(DomainError::internal("approve produced no approval event")),
        };

        let account: PointsAccount =
            dispatcher::rehydrate(self.store(), POINTS_STREAM, owner.get(), || {
                PointsAccount::empty(owner)
            })?;
        let credit = PointsCommand::Credit(CreditPoints {
            user_id: owner,
            amount: points_value,
            source: CreditSource::ListingApproved { listing_id },
            occurred_at,
        });
        let credit_events = account.handle(&credit)?;

        self.store()
            .append_transactional(vec![
                dispatcher::stream_append(
                    LISTING_STREAM,
                    listing_id.get(),
                    &listing_events,
                    ExpectedVersion::Exact(listing.version()),
                )?,
                dispatcher::stream_append(
                    POINTS_STREAM,
                    owner.get(),
                    &credit_events,
                    ExpectedVersion::Exact(account.version()),
                )?,
            ])
            .map_err(dispatcher::store_error)?;

        Ok(())
    }
}
