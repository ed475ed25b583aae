use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rewear_core::{Aggregate, AggregateRoot, DomainError, ListingId, SwapId, UserId};
use rewear_events::Event;

/// How the swap is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapKind {
    /// The requester spends points equal to the listing's value.
    PointRedemption,
    /// The parties trade items directly; no points move.
    DirectSwap,
}

/// Swap lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Approved,
    Rejected,
    InTransit,
    Completed,
}

impl SwapStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SwapStatus::Rejected | SwapStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Approved => "approved",
            SwapStatus::Rejected => "rejected",
            SwapStatus::InTransit => "in_transit",
            SwapStatus::Completed => "completed",
        }
    }
}

/// Aggregate root: Swap.
///
/// Captures the listing owner at open time so every later role check is
/// answerable from the swap's own state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    id: SwapId,
    requester: Option<UserId>,
    owner: Option<UserId>,
    listing_id: Option<ListingId>,
    kind: Option<SwapKind>,
    points_value: u64,
    status: SwapStatus,
    created_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Swap {
    /// Empty aggregate for rehydration.
    pub fn empty(id: SwapId) -> Self {
        Self {
            id,
            requester: None,
            owner: None,
            listing_id: None,
            kind: None,
            points_value: 0,
            status: SwapStatus::Pending,
            created_at: None,
            completed_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SwapId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn requester(&self) -> Option<UserId> {
        self.requester
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn listing_id(&self) -> Option<ListingId> {
        self.listing_id
    }

    pub fn kind(&self) -> Option<SwapKind> {
        self.kind
    }

    pub fn points_value(&self) -> u64 {
        self.points_value
    }

    pub fn status(&self) -> SwapStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

impl AggregateRoot for Swap {
    type Id = SwapId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenSwap. `owner` and `points_value` are snapshotted from the
/// listing by the orchestrating service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSwap {
    pub swap_id: SwapId,
    pub requester: UserId,
    pub owner: UserId,
    pub listing_id: ListingId,
    pub kind: SwapKind,
    pub points_value: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveSwap (listing owner accepts the request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveSwap {
    pub swap_id: SwapId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectSwap. The owner declines, or the requester cancels while
/// the request is still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectSwap {
    pub swap_id: SwapId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSwapInTransit (owner has shipped the item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSwapInTransit {
    pub swap_id: SwapId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteSwap (either party confirms receipt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteSwap {
    pub swap_id: SwapId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapCommand {
    Open(OpenSwap),
    Approve(ApproveSwap),
    Reject(RejectSwap),
    MarkInTransit(MarkSwapInTransit),
    Complete(CompleteSwap),
}

/// Event: SwapOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOpened {
    pub swap_id: SwapId,
    pub requester: UserId,
    pub owner: UserId,
    pub listing_id: ListingId,
    pub kind: SwapKind,
    pub points_value: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SwapApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapApproved {
    pub swap_id: SwapId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SwapRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRejected {
    pub swap_id: SwapId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SwapMarkedInTransit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapMarkedInTransit {
    pub swap_id: SwapId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SwapCompleted. Carries everything the settlement needs so the
/// orchestrating service can build the ledger entries without a re-read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCompleted {
    pub swap_id: SwapId,
    pub requester: UserId,
    pub owner: UserId,
    pub listing_id: ListingId,
    pub kind: SwapKind,
    pub points_value: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapEvent {
    Opened(SwapOpened),
    Approved(SwapApproved),
    Rejected(SwapRejected),
    MarkedInTransit(SwapMarkedInTransit),
    Completed(SwapCompleted),
}

impl Event for SwapEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SwapEvent::Opened(_) => "swap.opened",
            SwapEvent::Approved(_) => "swap.approved",
            SwapEvent::Rejected(_) => "swap.rejected",
            SwapEvent::MarkedInTransit(_) => "swap.marked_in_transit",
            SwapEvent::Completed(_) => "swap.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SwapEvent::Opened(e) => e.occurred_at,
            SwapEvent::Approved(e) => e.occurred_at,
            SwapEvent::Rejected(e) => e.occurred_at,
            SwapEvent::MarkedInTransit(e) => e.occurred_at,
            SwapEvent::Completed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Swap {
    type Command = SwapCommand;
    type Event = SwapEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SwapEvent::Opened(e) => {
                self.id = e.swap_id;
                self.requester = Some(e.requester);
                self.owner = Some(e.owner);
                self.listing_id = Some(e.listing_id);
                self.kind = Some(e.kind);
                self.points_value = e.points_value;
                self.status = SwapStatus::Pending;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            SwapEvent::Approved(_) => {
                self.status = SwapStatus::Approved;
            }
            SwapEvent::Rejected(_) => {
                self.status = SwapStatus::Rejected;
            }
            SwapEvent::MarkedInTransit(_) => {
                self.status = SwapStatus::InTransit;
            }
            SwapEvent::Completed(e) => {
                self.status = SwapStatus::Completed;
                self.completed_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SwapCommand::Open(cmd) => self.handle_open(cmd),
            SwapCommand::Approve(cmd) => self.handle_approve(cmd),
            SwapCommand::Reject(cmd) => self.handle_reject(cmd),
            SwapCommand::MarkInTransit(cmd) => self.handle_mark_in_transit(cmd),
            SwapCommand::Complete(cmd) => self.handle_complete(cmd),
        }
    }
}

impl Swap {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn is_owner(&self, actor: UserId) -> bool {
        self.owner == Some(actor)
    }

    fn is_party(&self, actor: UserId) -> bool {
        self.is_owner(actor) || self.requester == Some(actor)
    }

    fn handle_open(&self, cmd: &OpenSwap) -> Result<Vec<SwapEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("swap already exists"));
        }
        if cmd.requester == cmd.owner {
            return Err(DomainError::validation(
                "cannot open a swap on your own listing",
            ));
        }

        Ok(vec![SwapEvent::Opened(SwapOpened {
            swap_id: cmd.swap_id,
            requester: cmd.requester,
            owner: cmd.owner,
            listing_id: cmd.listing_id,
            kind: cmd.kind,
            points_value: cmd.points_value,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveSwap) -> Result<Vec<SwapEvent>, DomainError> {
        self.ensure_created()?;

        if !self.is_owner(cmd.actor) {
            return Err(DomainError::PermissionDenied);
        }
        if self.status != SwapStatus::Pending {
            return Err(DomainError::invalid_transition(
                "only pending swaps can be approved",
            ));
        }

        Ok(vec![SwapEvent::Approved(SwapApproved {
            swap_id: cmd.swap_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectSwap) -> Result<Vec<SwapEvent>, DomainError> {
        self.ensure_created()?;

        // Owner declines; requester may cancel while still pending.
        if !self.is_party(cmd.actor) {
            return Err(DomainError::PermissionDenied);
        }
        if self.status != SwapStatus::Pending {
            return Err(DomainError::invalid_transition(
                "only pending swaps can be rejected",
            ));
        }

        Ok(vec![SwapEvent::Rejected(SwapRejected {
            swap_id: cmd.swap_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_in_transit(
        &self,
        cmd: &MarkSwapInTransit,
    ) -> Result<Vec<SwapEvent>, DomainError> {
        self.ensure_created()?;

        if !self.is_owner(cmd.actor) {
            return Err(DomainError::PermissionDenied);
        }
        if self.status != SwapStatus::Approved {
            return Err(DomainError::invalid_transition(
                "only approved swaps can be marked in transit",
            ));
        }

        Ok(vec![SwapEvent::MarkedInTransit(SwapMarkedInTransit {
            swap_id: cmd.swap_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteSwap) -> Result<Vec<SwapEvent>, DomainError> {
        self.ensure_created()?;

        if !self.is_party(cmd.actor) {
            return Err(DomainError::PermissionDenied);
        }
        if self.status != SwapStatus::InTransit {
            return Err(DomainError::invalid_transition(
                "only in-transit swaps can be completed",
            ));
        }

        let (requester, owner, listing_id, kind) =
            match (self.requester, self.owner, self.listing_id, self.kind) {
                (Some(r), Some(o), Some(l), Some(k)) => (r, o, l, k),
                _ => return Err(DomainError::internal("created swap missing parties")),
            };

        Ok(vec![SwapEvent::Completed(SwapCompleted {
            swap_id: cmd.swap_id,
            requester,
            owner,
            listing_id,
            kind,
            points_value: self.points_value,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUESTER: u64 = 2;
    const OWNER: u64 = 7;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn open_cmd(kind: SwapKind) -> SwapCommand {
        SwapCommand::Open(OpenSwap {
            swap_id: SwapId::new(1),
            requester: UserId::new(REQUESTER),
            owner: UserId::new(OWNER),
            listing_id: ListingId::new(9),
            kind,
            points_value: 45,
            occurred_at: test_time(),
        })
    }

    fn run(swap: &mut Swap, cmd: SwapCommand) -> Result<(), DomainError> {
        let events = swap.handle(&cmd)?;
        for e in &events {
            swap.apply(e);
        }
        Ok(())
    }

    fn opened(kind: SwapKind) -> Swap {
        let mut swap = Swap::empty(SwapId::new(1));
        run(&mut swap, open_cmd(kind)).unwrap();
        swap
    }

    #[test]
    fn full_lifecycle_reaches_completed() {
        let mut swap = opened(SwapKind::PointRedemption);
        assert_eq!(swap.status(), SwapStatus::Pending);

        run(
            &mut swap,
            SwapCommand::Approve(ApproveSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(OWNER),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        run(
            &mut swap,
            SwapCommand::MarkInTransit(MarkSwapInTransit {
                swap_id: SwapId::new(1),
                actor: UserId::new(OWNER),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        run(
            &mut swap,
            SwapCommand::Complete(CompleteSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(REQUESTER),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(swap.status(), SwapStatus::Completed);
        assert!(swap.status().is_terminal());
        assert!(swap.completed_at().is_some());
        assert_eq!(swap.version(), 4);
    }

    #[test]
    fn requester_cannot_approve_own_request() {
        let swap = opened(SwapKind::DirectSwap);
        let err = swap
            .handle(&SwapCommand::Approve(ApproveSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(REQUESTER),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::PermissionDenied);
    }

    #[test]
    fn requester_can_cancel_while_pending() {
        let mut swap = opened(SwapKind::DirectSwap);
        run(
            &mut swap,
            SwapCommand::Reject(RejectSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(REQUESTER),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(swap.status(), SwapStatus::Rejected);
    }

    #[test]
    fn cannot_complete_before_transit() {
        let mut swap = opened(SwapKind::PointRedemption);
        run(
            &mut swap,
            SwapCommand::Approve(ApproveSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(OWNER),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let err = swap
            .handle(&SwapCommand::Complete(CompleteSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(OWNER),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn rejected_swap_is_terminal() {
        let mut swap = opened(SwapKind::DirectSwap);
        run(
            &mut swap,
            SwapCommand::Reject(RejectSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(OWNER),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let err = swap
            .handle(&SwapCommand::Approve(ApproveSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(OWNER),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn self_swap_is_rejected_at_open() {
        let swap = Swap::empty(SwapId::new(1));
        let err = swap
            .handle(&SwapCommand::Open(OpenSwap {
                swap_id: SwapId::new(1),
                requester: UserId::new(OWNER),
                owner: UserId::new(OWNER),
                listing_id: ListingId::new(9),
                kind: SwapKind::DirectSwap,
                points_value: 45,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn completed_event_carries_settlement_data() {
        let mut swap = opened(SwapKind::PointRedemption);
        run(
            &mut swap,
            SwapCommand::Approve(ApproveSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(OWNER),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        run(
            &mut swap,
            SwapCommand::MarkInTransit(MarkSwapInTransit {
                swap_id: SwapId::new(1),
                actor: UserId::new(OWNER),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let events = swap
            .handle(&SwapCommand::Complete(CompleteSwap {
                swap_id: SwapId::new(1),
                actor: UserId::new(OWNER),
                occurred_at: test_time(),
            }))
            .unwrap();
        match &events[0] {
            SwapEvent::Completed(e) => {
                assert_eq!(e.requester, UserId::new(REQUESTER));
                assert_eq!(e.owner, UserId::new(OWNER));
                assert_eq!(e.points_value, 45);
                assert_eq!(e.kind, SwapKind::PointRedemption);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }
}
