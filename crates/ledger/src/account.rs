use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rewear_core::{Aggregate, AggregateRoot, DomainError, ListingId, SwapId, UserId};
use rewear_events::Event;

/// Where a credit came from. Structured so the ledger stays auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditSource {
    /// A listing passed moderation and earned the owner its points value.
    ListingApproved { listing_id: ListingId },
    /// A completed swap paid the listing owner.
    SwapIncome { swap_id: SwapId },
    /// Manual adjustment by an administrator.
    Adjustment,
}

/// Why a debit happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebitReason {
    /// Points spent to complete a point-redemption swap.
    Redemption { swap_id: SwapId },
    /// Manual adjustment by an administrator.
    Adjustment,
}

/// Aggregate root: PointsAccount.
///
/// Does not store a mutable counter; `balance` is the projection of every
/// credit and debit replayed in order. Negative balances are unrepresentable:
/// `handle` refuses any debit that would cross zero, and stale reads lose the
/// `ExpectedVersion::Exact` append race instead of double-spending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsAccount {
    id: UserId,
    balance: u64,
    version: u64,
}

impl PointsAccount {
    /// Empty account for rehydration. A user with no ledger entries simply
    /// has balance zero; there is no separate "opened" state.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            balance: 0,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> UserId {
        self.id
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }
}

impl AggregateRoot for PointsAccount {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: credit points to the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPoints {
    pub user_id: UserId,
    pub amount: u64,
    pub source: CreditSource,
    pub occurred_at: DateTime<Utc>,
}

/// Command: debit points from the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitPoints {
    pub user_id: UserId,
    pub amount: u64,
    pub reason: DebitReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointsCommand {
    Credit(CreditPoints),
    Debit(DebitPoints),
}

/// Event: PointsCredited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsCredited {
    pub user_id: UserId,
    pub amount: u64,
    pub source: CreditSource,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PointsDebited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsDebited {
    pub user_id: UserId,
    pub amount: u64,
    pub reason: DebitReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointsEvent {
    Credited(PointsCredited),
    Debited(PointsDebited),
}

impl Event for PointsEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PointsEvent::Credited(_) => "points.credited",
            PointsEvent::Debited(_) => "points.debited",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PointsEvent::Credited(e) => e.occurred_at,
            PointsEvent::Debited(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PointsAccount {
    type Command = PointsCommand;
    type Event = PointsEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PointsEvent::Credited(e) => {
                self.id = e.user_id;
                self.balance = self.balance.saturating_add(e.amount);
            }
            PointsEvent::Debited(e) => {
                self.id = e.user_id;
                self.balance = self.balance.saturating_sub(e.amount);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PointsCommand::Credit(cmd) => {
                if cmd.amount == 0 {
                    return Err(DomainError::validation("amount must be positive"));
                }
                Ok(vec![PointsEvent::Credited(PointsCredited {
                    user_id: cmd.user_id,
                    amount: cmd.amount,
                    source: cmd.source,
                    occurred_at: cmd.occurred_at,
                })])
            }
            PointsCommand::Debit(cmd) => {
                if cmd.amount == 0 {
                    return Err(DomainError::validation("amount must be positive"));
                }
                if cmd.amount > self.balance {
                    return Err(DomainError::InsufficientBalance {
                        balance: self.balance,
                        requested: cmd.amount,
                    });
                }
                Ok(vec![PointsEvent::Debited(PointsDebited {
                    user_id: cmd.user_id,
                    amount: cmd.amount,
                    reason: cmd.reason,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
