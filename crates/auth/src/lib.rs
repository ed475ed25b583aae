//! `rewear-auth` — pure authorization boundary.
//!
//! How an identity was established (cookies, tokens) is out of scope; this
//! crate only answers "may this verified identity perform this action", and
//! answers it fail-closed.

pub mod authorize;
pub mod permission;
pub mod principal;

pub use authorize::{AuthzError, authorize};
pub use permission::Permission;
pub use principal::Principal;
