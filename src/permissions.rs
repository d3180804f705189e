//! Object-level access rules shared by folders, documents and comments.
//!
//! Two policies exist:
//! * owner-or-admin: anyone may read, only the owner or a privileged user may write.
//! * owner-admin-or-shared: privileged users and the owner may do anything;
//!   public objects and users the object is shared with may only read.
//!
//! Visibility (which objects appear in listings at all) is enforced in SQL by
//! the repositories; these checks run after an object has been found.

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use axum::http::Method;
use uuid::Uuid;

const DENIED: &str = "You do not have permission to perform this action.";

/// GET, HEAD and OPTIONS never modify state
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Identity of the caller as far as access checks are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Uuid,
    pub privileged: bool,
}

impl From<&AuthUser> for Requester {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            privileged: user.is_privileged(),
        }
    }
}

/// Ownership and sharing facts about an object
#[derive(Debug, Clone, Copy)]
pub struct AccessFacts<'a> {
    pub owner_id: Uuid,
    pub is_public: bool,
    pub shared_with: &'a [Uuid],
}

pub fn is_owner_or_admin(requester: Requester, owner_id: Uuid, method: &Method) -> bool {
    is_safe_method(method) || requester.privileged || requester.id == owner_id
}

pub fn is_owner_admin_or_shared(requester: Requester, facts: AccessFacts<'_>, method: &Method) -> bool {
    if requester.privileged || requester.id == facts.owner_id {
        return true;
    }
    let can_read = facts.is_public || facts.shared_with.contains(&requester.id);
    can_read && is_safe_method(method)
}

/// Whether the caller could see the object in a listing
pub fn is_visible(requester: Requester, facts: AccessFacts<'_>) -> bool {
    requester.id == facts.owner_id || facts.is_public || facts.shared_with.contains(&requester.id)
}

pub fn require(allowed: bool) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(DENIED.to_string()))
    }
}
