//! Moderation audit trail.
//!
//! Every admin decision lands here exactly once, append-only. Community flag
//! reports are not admin actions and never appear in this log.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rewear_core::{DomainError, DomainResult, ListingId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminActionKind {
    Approved,
    Rejected,
    Removed,
    ClearedFlag,
}

impl AdminActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminActionKind::Approved => "approved",
            AdminActionKind::Rejected => "rejected",
            AdminActionKind::Removed => "removed",
            AdminActionKind::ClearedFlag => "cleared_flag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminActionRecord {
    pub id: Uuid,
    pub action: AdminActionKind,
    pub admin: UserId,
    pub listing_id: ListingId,
    pub occurred_at: DateTime<Utc>,
}

/// Append-only log of admin actions.
#[derive(Debug, Default)]
pub struct AuditLog {
    records: RwLock<Vec<AdminActionRecord>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &self,
        action: AdminActionKind,
        admin: UserId,
        listing_id: ListingId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<AdminActionRecord> {
        let record = AdminActionRecord {
            id: Uuid::now_v7(),
            action,
            admin,
            listing_id,
            occurred_at,
        };

        let mut records = self
            .records
            .write()
            .map_err(|_| DomainError::internal("audit log lock poisoned"))?;
        records.push(record.clone());

        tracing::info!(
            action = action.as_str(),
            admin = %admin,
            listing_id = %listing_id,
            "admin action recorded"
        );
        Ok(record)
    }

    /// Newest first.
    pub fn list_recent(&self, limit: usize, offset: usize) -> DomainResult<Vec<AdminActionRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::internal("audit log lock poisoned"))?;

        Ok(records
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Count actions of one kind whose timestamp falls on `now`'s calendar day (UTC).
    pub fn count_today(&self, kind: AdminActionKind, now: DateTime<Utc>) -> DomainResult<u64> {
        let records = self
            .records
            .read()
            .map_err(|_| DomainError::internal("audit log lock poisoned"))?;

        let today = now.date_naive();
        Ok(records
            .iter()
            .filter(|r| r.action == kind && r.occurred_at.date_naive() == today)
            .count() as u64)
    }
}
