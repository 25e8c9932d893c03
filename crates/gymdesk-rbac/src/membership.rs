//! Membership domain model
//!
//! A membership links a user to an organization with a role. A user may
//! belong to several organizations with different roles; for each
//! (user, organization) pair at most one active row is authoritative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organization membership linking a user to an organization and role.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use gymdesk_rbac::Membership;
///
/// let org_id = Uuid::now_v7();
/// let user_id = Uuid::now_v7();
/// let role_id = Uuid::now_v7();
/// let membership = Membership::new(user_id, org_id, role_id);
/// assert!(membership.is_active);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    /// Unique membership ID
    pub id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// Role within the organization
    pub role_id: Uuid,

    /// Whether the membership is active
    pub is_active: bool,

    /// When the user joined
    pub joined_at: DateTime<Utc>,

    /// Who invited this user (if applicable)
    #[serde(default)]
    pub invited_by: Option<Uuid>,
}

impl Membership {
    /// Creates a new, active membership.
    pub fn new(user_id: Uuid, organization_id: Uuid, role_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            organization_id,
            role_id,
            is_active: true,
            joined_at: Utc::now(),
            invited_by: None,
        }
    }

    /// Set who invited this user.
    pub fn with_inviter(mut self, inviter_id: Uuid) -> Self {
        self.invited_by = Some(inviter_id);
        self
    }

    /// Mark the membership inactive.
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// The most recently joined membership, ties broken by id.
    pub fn latest(memberships: impl IntoIterator<Item = Membership>) -> Option<Membership> {
        memberships
            .into_iter()
            .max_by_key(|membership| (membership.joined_at, membership.id))
    }
}
