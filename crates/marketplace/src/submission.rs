//! Item submission.

use serde::Serialize;

use rewear_auth::{authorize, permission};
use rewear_core::{DomainError, DomainResult, ListingId, UserId};
use rewear_infra::dispatcher;
use rewear_listings::{
    Listing, ListingCommand, ListingDetails, ListingEvent, ListingStatus, SendForReview,
    SubmitListing, TagSet, image_set,
};

use crate::{LISTING_STREAM, Marketplace};

/// What the submitter gets back: the assigned id and the initial status
/// (Draft, or Pending when submitted straight into the moderation queue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub listing_id: ListingId,
    pub status: ListingStatus,
}

impl Marketplace {
    /// List an item. Image URLs reference already-hosted media; the first
    /// becomes the primary image. Tags are normalized (trimmed, lowercased,
    /// deduplicated).
    pub fn submit_item(
        &self,
        owner_id: UserId,
        details: ListingDetails,
        image_urls: Vec<String>,
        tags: Vec<String>,
        as_draft: bool,
    ) -> DomainResult<SubmissionReceipt> {
        let principal = self.users().principal(owner_id)?;
        authorize(&principal, &permission::SUBMIT_LISTINGS)
            .map_err(|_| DomainError::PermissionDenied)?;

        let listing_id = ListingId::new(self.next_listing_id());
        let cmd = ListingCommand::Submit(SubmitListing {
            listing_id,
            owner: owner_id,
            details,
            images: image_set(image_urls),
            tags: TagSet::normalize(tags),
            as_draft,
            occurred_at: self.now(),
        });

        let events = dispatcher::execute(self.store(), LISTING_STREAM, listing_id.get(), &cmd, || {
            Listing::empty(listing_id)
        })?;

        match events.first() {
            Some(ListingEvent::Submitted(e)) => Ok(SubmissionReceipt {
                listing_id,
                status: e.initial_status,
            }),
            _ => Err(DomainError::internal("submit produced no submission event")),
        }
    }

    /// Promote a draft into the moderation queue. Owner-only.
    pub fn submit_for_review(&self, listing_id: ListingId, owner_id: UserId) -> DomainResult<()> {
        self.users().require(owner_id)?;

        let cmd = ListingCommand::SendForReview(SendForReview {
            listing_id,
            owner: owner_id,
            occurred_at: self.now(),
        });

        dispatcher::execute_classified(self.store(), LISTING_STREAM, listing_id.get(), &cmd, || {
            Listing::empty(listing_id)
        })?;
        Ok(())
    }
}
