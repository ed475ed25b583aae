use serde::{Deserialize, Serialize};

use rewear_core::UserId;

use crate::permission::{self, Permission};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: the surrounding
/// collaborator (which established the identity) mints principals from the
/// user directory. The admin capability is an explicit permission grant here,
/// not a boolean column consulted at mutation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn new(user_id: UserId, permissions: Vec<Permission>) -> Self {
        Self {
            user_id,
            permissions,
        }
    }

    /// Principal carrying the admin capability (wildcard grant).
    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, vec![Permission::from_static("*")])
    }

    /// Principal of an ordinary member (owner-side operations only).
    pub fn member(user_id: UserId) -> Self {
        Self::new(user_id, vec![permission::SUBMIT_LISTINGS])
    }
}
