//! User directory: the identity seam.
//!
//! Accounts, point balances, and listings all key off [`UserId`]; the
//! directory owns id assignment and role lookup. Token issuance and session
//! mechanics live outside this system; callers arrive with a resolved user id.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rewear_auth::Principal;
use rewear_core::{DomainError, DomainResult, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub location: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// In-memory user registry with atomic id assignment.
#[derive(Debug)]
pub struct UserDirectory {
    next_id: AtomicU64,
    users: RwLock<HashMap<UserId, UserProfile>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            users: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        location: Option<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> DomainResult<UserProfile> {
        let name = name.into();
        let email = email.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        if email.trim().is_empty() || !email.contains('@') {
            return Err(DomainError::validation("a valid email is required"));
        }

        let id = UserId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let profile = UserProfile {
            id,
            name,
            email,
            location,
            role,
            created_at: now,
        };

        let mut users = self
            .users
            .write()
            .map_err(|_| DomainError::internal("user directory lock poisoned"))?;
        users.insert(id, profile.clone());

        tracing::debug!(user_id = %id, role = ?role, "user registered");
        Ok(profile)
    }

    pub fn get(&self, user_id: UserId) -> DomainResult<Option<UserProfile>> {
        let users = self
            .users
            .read()
            .map_err(|_| DomainError::internal("user directory lock poisoned"))?;
        Ok(users.get(&user_id).cloned())
    }

    pub fn require(&self, user_id: UserId) -> DomainResult<UserProfile> {
        self.get(user_id)?.ok_or(DomainError::NotFound)
    }

    /// Mint the principal for a user based on their role.
    pub fn principal(&self, user_id: UserId) -> DomainResult<Principal> {
        let profile = self.require(user_id)?;
        Ok(match profile.role {
            Role::Admin => Principal::admin(user_id),
            Role::Member => Principal::member(user_id),
        })
    }

    /// Fail-closed admin principal: a member asking for one is refused.
    pub fn admin_principal(&self, user_id: UserId) -> DomainResult<Principal> {
        let profile = self.require(user_id)?;
        match profile.role {
            Role::Admin => Ok(Principal::admin(user_id)),
            Role::Member => Err(DomainError::PermissionDenied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_assigns_sequential_ids() {
        let directory = UserDirectory::new();
        let a = directory
            .register("Asha", "asha@example.com", None, Role::Member, Utc::now())
            .unwrap();
        let b = directory
            .register("Femi", "femi@example.com", None, Role::Admin, Utc::now())
            .unwrap();
        assert_eq!(a.id, UserId::new(1));
        assert_eq!(b.id, UserId::new(2));
    }

    #[test]
    fn admin_principal_is_fail_closed() {
        let directory = UserDirectory::new();
        let member = directory
            .register("Asha", "asha@example.com", None, Role::Member, Utc::now())
            .unwrap();

        let err = directory.admin_principal(member.id).unwrap_err();
        assert_eq!(err, DomainError::PermissionDenied);

        let err = directory.admin_principal(UserId::new(404)).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn register_keeps_optional_location() {
        let directory = UserDirectory::new();
        let located = directory
            .register(
                "Asha",
                "asha@example.com",
                Some("Lisbon".to_string()),
                Role::Member,
                Utc::now(),
            )
            .unwrap();
        let unlocated = directory
            .register("Femi", "femi@example.com", None, Role::Member, Utc::now())
            .unwrap();

        assert_eq!(located.location.as_deref(), Some("Lisbon"));
        assert_eq!(directory.require(located.id).unwrap().location.as_deref(), Some("Lisbon"));
        assert_eq!(unlocated.location, None);
    }

    #[test]
    fn invalid_email_is_rejected() {
        let directory = UserDirectory::new();
        let err = directory
            .register("Asha", "not-an-email", None, Role::Member, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
