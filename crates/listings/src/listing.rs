use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rewear_core::{Aggregate, AggregateRoot, DomainError, ListingId, SwapId, UserId};
use rewear_events::Event;

use crate::media::{ItemImage, TagSet};
use crate::valuation::{self, Category, Condition};

/// Listing lifecycle status.
///
/// The single source of truth for the item's state; "has this been approved"
/// is derived from it (see [`Listing::has_been_approved`]), never stored
/// separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    Pending,
    Available,
    Rejected,
    Flagged,
    Removed,
    Swapped,
}

impl ListingStatus {
    /// Terminal states: the listing can only be re-listed as a new listing.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ListingStatus::Rejected | ListingStatus::Removed | ListingStatus::Swapped
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Pending => "pending",
            ListingStatus::Available => "available",
            ListingStatus::Rejected => "rejected",
            ListingStatus::Flagged => "flagged",
            ListingStatus::Removed => "removed",
            ListingStatus::Swapped => "swapped",
        }
    }
}

/// Who filed a flag report: a community member or automated detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    User(UserId),
    AutoDetection,
}

/// Descriptive fields captured at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub item_type: String,
    pub size: String,
    pub condition: Condition,
}

impl ListingDetails {
    fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description is required"));
        }
        if self.item_type.trim().is_empty() {
            return Err(DomainError::validation("item type is required"));
        }
        if self.size.trim().is_empty() {
            return Err(DomainError::validation("size is required"));
        }
        Ok(())
    }
}

/// Aggregate root: Listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    id: ListingId,
    owner: Option<UserId>,
    details: Option<ListingDetails>,
    images: Vec<ItemImage>,
    tags: TagSet,
    points_value: u64,
    status: ListingStatus,
    active_swap: Option<SwapId>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Listing {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ListingId) -> Self {
        Self {
            id,
            owner: None,
            details: None,
            images: Vec::new(),
            tags: TagSet::default(),
            points_value: 0,
            status: ListingStatus::Draft,
            active_swap: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ListingId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn details(&self) -> Option<&ListingDetails> {
        self.details.as_ref()
    }

    pub fn images(&self) -> &[ItemImage] {
        &self.images
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn points_value(&self) -> u64 {
        self.points_value
    }

    pub fn status(&self) -> ListingStatus {
        self.status
    }

    pub fn active_swap(&self) -> Option<SwapId> {
        self.active_swap
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Derived approval check: the listing has passed moderation at some
    /// point. Replaces the historical `approved` boolean column.
    pub fn has_been_approved(&self) -> bool {
        matches!(
            self.status,
            ListingStatus::Available | ListingStatus::Flagged | ListingStatus::Swapped
        )
    }
}

impl AggregateRoot for Listing {
    type Id = ListingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitListing (initial draft or pending, chosen by the owner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitListing {
    pub listing_id: ListingId,
    pub owner: UserId,
    pub details: ListingDetails,
    pub images: Vec<ItemImage>,
    pub tags: TagSet,
    pub as_draft: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendForReview (owner promotes a draft to pending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendForReview {
    pub listing_id: ListingId,
    pub owner: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveListing (admin decision).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproveListing {
    pub listing_id: ListingId,
    pub admin: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectListing (admin decision).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectListing {
    pub listing_id: ListingId,
    pub admin: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FlagListing (community report or automated detection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagListing {
    pub listing_id: ListingId,
    pub reason: String,
    pub source: ReportSource,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearListingFlag (admin decision).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearListingFlag {
    pub listing_id: ListingId,
    pub admin: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveListing (admin pulls a flagged or available listing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveListing {
    pub listing_id: ListingId,
    pub admin: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReserveListing (a swap opens against the listing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveListing {
    pub listing_id: ListingId,
    pub swap_id: SwapId,
    pub requester: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReleaseListing (the active swap ended without completing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseListing {
    pub listing_id: ListingId,
    pub swap_id: SwapId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkListingSwapped (the active swap completed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkListingSwapped {
    pub listing_id: ListingId,
    pub swap_id: SwapId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListingCommand {
    Submit(SubmitListing),
    SendForReview(SendForReview),
    Approve(ApproveListing),
    Reject(RejectListing),
    Flag(FlagListing),
    ClearFlag(ClearListingFlag),
    Remove(RemoveListing),
    Reserve(ReserveListing),
    Release(ReleaseListing),
    MarkSwapped(MarkListingSwapped),
}

/// Event: ListingSubmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSubmitted {
    pub listing_id: ListingId,
    pub owner: UserId,
    pub details: ListingDetails,
    pub images: Vec<ItemImage>,
    pub tags: TagSet,
    pub points_value: u64,
    pub initial_status: ListingStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListingSentForReview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSentForReview {
    pub listing_id: ListingId,
    pub owner: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListingApproved.
///
/// Carries the owner and points value so the orchestrating service can build
/// the matching ledger credit without re-reading listing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingApproved {
    pub listing_id: ListingId,
    pub admin: UserId,
    pub owner: UserId,
    pub points_value: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListingRejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRejected {
    pub listing_id: ListingId,
    pub admin: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListingFlagged. The event is the report record (reason + source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingFlagged {
    pub listing_id: ListingId,
    pub reason: String,
    pub source: ReportSource,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListingFlagCleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingFlagCleared {
    pub listing_id: ListingId,
    pub admin: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListingRemoved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRemoved {
    pub listing_id: ListingId,
    pub admin: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListingReserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingReserved {
    pub listing_id: ListingId,
    pub swap_id: SwapId,
    pub requester: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListingReleased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingReleased {
    pub listing_id: ListingId,
    pub swap_id: SwapId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ListingSwapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSwapped {
    pub listing_id: ListingId,
    pub swap_id: SwapId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListingEvent {
    Submitted(ListingSubmitted),
    SentForReview(ListingSentForReview),
    Approved(ListingApproved),
    Rejected(ListingRejected),
    Flagged(ListingFlagged),
    FlagCleared(ListingFlagCleared),
    Removed(ListingRemoved),
    Reserved(ListingReserved),
    Released(ListingReleased),
    Swapped(ListingSwapped),
}

impl Event for ListingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ListingEvent::Submitted(_) => "listing.submitted",
            ListingEvent::SentForReview(_) => "listing.sent_for_review",
            ListingEvent::Approved(_) => "listing.approved",
            ListingEvent::Rejected(_) => "listing.rejected",
            ListingEvent::Flagged(_) => "listing.flagged",
            ListingEvent::FlagCleared(_) => "listing.flag_cleared",
            ListingEvent::Removed(_) => "listing.removed",
            ListingEvent::Reserved(_) => "listing.reserved",
            ListingEvent::Released(_) => "listing.released",
            ListingEvent::Swapped(_) => "listing.swapped",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ListingEvent::Submitted(e) => e.occurred_at,
            ListingEvent::SentForReview(e) => e.occurred_at,
            ListingEvent::Approved(e) => e.occurred_at,
            ListingEvent::Rejected(e) => e.occurred_at,
            ListingEvent::Flagged(e) => e.occurred_at,
            ListingEvent::FlagCleared(e) => e.occurred_at,
            ListingEvent::Removed(e) => e.occurred_at,
            ListingEvent::Reserved(e) => e.occurred_at,
            ListingEvent::Released(e) => e.occurred_at,
            ListingEvent::Swapped(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Listing {
    type Command = ListingCommand;
    type Event = ListingEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ListingEvent::Submitted(e) => {
                self.id = e.listing_id;
                self.owner = Some(e.owner);
                self.details = Some(e.details.clone());
                self.images = e.images.clone();
                self.tags = e.tags.clone();
                self.points_value = e.points_value;
                self.status = e.initial_status;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            ListingEvent::SentForReview(_) => {
                self.status = ListingStatus::Pending;
            }
            ListingEvent::Approved(_) => {
                self.status = ListingStatus::Available;
            }
            ListingEvent::Rejected(_) => {
                self.status = ListingStatus::Rejected;
            }
            ListingEvent::Flagged(_) => {
                self.status = ListingStatus::Flagged;
            }
            ListingEvent::FlagCleared(_) => {
                self.status = ListingStatus::Available;
            }
            ListingEvent::Removed(_) => {
                self.status = ListingStatus::Removed;
                self.active_swap = None;
            }
            ListingEvent::Reserved(e) => {
                self.active_swap = Some(e.swap_id);
            }
            ListingEvent::Released(_) => {
                self.active_swap = None;
            }
            ListingEvent::Swapped(_) => {
                self.status = ListingStatus::Swapped;
                self.active_swap = None;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ListingCommand::Submit(cmd) => self.handle_submit(cmd),
            ListingCommand::SendForReview(cmd) => self.handle_send_for_review(cmd),
            ListingCommand::Approve(cmd) => self.handle_approve(cmd),
            ListingCommand::Reject(cmd) => self.handle_reject(cmd),
            ListingCommand::Flag(cmd) => self.handle_flag(cmd),
            ListingCommand::ClearFlag(cmd) => self.handle_clear_flag(cmd),
            ListingCommand::Remove(cmd) => self.handle_remove(cmd),
            ListingCommand::Reserve(cmd) => self.handle_reserve(cmd),
            ListingCommand::Release(cmd) => self.handle_release(cmd),
            ListingCommand::MarkSwapped(cmd) => self.handle_mark_swapped(cmd),
        }
    }
}

impl Listing {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitListing) -> Result<Vec<ListingEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("listing already exists"));
        }

        cmd.details.validate()?;

        if !cmd.as_draft && cmd.images.is_empty() {
            return Err(DomainError::validation("at least one image is required"));
        }

        if cmd.images.iter().filter(|i| i.is_primary).count() > 1 {
            return Err(DomainError::validation(
                "a listing may have at most one primary image",
            ));
        }

        let initial_status = if cmd.as_draft {
            ListingStatus::Draft
        } else {
            ListingStatus::Pending
        };

        Ok(vec![ListingEvent::Submitted(ListingSubmitted {
            listing_id: cmd.listing_id,
            owner: cmd.owner,
            details: cmd.details.clone(),
            images: cmd.images.clone(),
            tags: cmd.tags.clone(),
            points_value: valuation::points_value(cmd.details.category, cmd.details.condition),
            initial_status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_send_for_review(
        &self,
        cmd: &SendForReview,
    ) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_created()?;

        if self.owner != Some(cmd.owner) {
            return Err(DomainError::PermissionDenied);
        }
        if self.status != ListingStatus::Draft {
            return Err(DomainError::invalid_transition(
                "only drafts can be sent for review",
            ));
        }

        Ok(vec![ListingEvent::SentForReview(ListingSentForReview {
            listing_id: cmd.listing_id,
            owner: cmd.owner,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveListing) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_created()?;

        if self.status != ListingStatus::Pending {
            return Err(DomainError::invalid_transition(
                "only pending listings can be approved",
            ));
        }

        let owner = self
            .owner
            .ok_or_else(|| DomainError::internal("created listing without owner"))?;

        Ok(vec![ListingEvent::Approved(ListingApproved {
            listing_id: cmd.listing_id,
            admin: cmd.admin,
            owner,
            points_value: self.points_value,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectListing) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_created()?;

        if self.status != ListingStatus::Pending {
            return Err(DomainError::invalid_transition(
                "only pending listings can be rejected",
            ));
        }

        Ok(vec![ListingEvent::Rejected(ListingRejected {
            listing_id: cmd.listing_id,
            admin: cmd.admin,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_flag(&self, cmd: &FlagListing) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_created()?;

        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("a report needs a reason"));
        }
        if self.status != ListingStatus::Available {
            return Err(DomainError::invalid_transition(
                "only available listings can be flagged",
            ));
        }

        Ok(vec![ListingEvent::Flagged(ListingFlagged {
            listing_id: cmd.listing_id,
            reason: cmd.reason.clone(),
            source: cmd.source,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_clear_flag(
        &self,
        cmd: &ClearListingFlag,
    ) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_created()?;

        if self.status != ListingStatus::Flagged {
            return Err(DomainError::invalid_transition(
                "only flagged listings can have their flag cleared",
            ));
        }

        Ok(vec![ListingEvent::FlagCleared(ListingFlagCleared {
            listing_id: cmd.listing_id,
            admin: cmd.admin,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveListing) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_created()?;

        if !matches!(
            self.status,
            ListingStatus::Flagged | ListingStatus::Available
        ) {
            return Err(DomainError::invalid_transition(
                "only flagged or available listings can be removed",
            ));
        }

        Ok(vec![ListingEvent::Removed(ListingRemoved {
            listing_id: cmd.listing_id,
            admin: cmd.admin,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reserve(&self, cmd: &ReserveListing) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_created()?;

        if self.owner == Some(cmd.requester) {
            return Err(DomainError::validation(
                "cannot open a swap on your own listing",
            ));
        }
        if self.status != ListingStatus::Available {
            return Err(DomainError::invalid_transition(
                "only available listings can be swapped for",
            ));
        }
        if self.active_swap.is_some() {
            return Err(DomainError::invalid_transition(
                "listing already has an active swap",
            ));
        }

        Ok(vec![ListingEvent::Reserved(ListingReserved {
            listing_id: cmd.listing_id,
            swap_id: cmd.swap_id,
            requester: cmd.requester,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &ReleaseListing) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_created()?;

        if self.active_swap != Some(cmd.swap_id) {
            return Err(DomainError::invalid_transition(
                "listing is not reserved by this swap",
            ));
        }

        Ok(vec![ListingEvent::Released(ListingReleased {
            listing_id: cmd.listing_id,
            swap_id: cmd.swap_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_swapped(
        &self,
        cmd: &MarkListingSwapped,
    ) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_created()?;

        if self.status != ListingStatus::Available {
            return Err(DomainError::invalid_transition(
                "only available listings can be marked swapped",
            ));
        }
        if self.active_swap != Some(cmd.swap_id) {
            return Err(DomainError::invalid_transition(
                "listing is not reserved by this swap",
            ));
        }

        Ok(vec![ListingEvent::Swapped(ListingSwapped {
            listing_id: cmd.listing_id,
            swap_id: cmd.swap_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
