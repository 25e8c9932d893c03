//! Role definitions
//!
//! Roles are named bundles of permissions. System roles are seeded once and
//! shared by every organization; custom roles belong to one organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::actions::Action;
use crate::permissions::{PermissionKey, PermissionSet};
use crate::resources::ResourceType;

/// A role as stored in the `roles` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// Unique role ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Stable short key (e.g. `owner`, `front-desk`)
    pub slug: String,

    /// System-defined roles cannot be edited by tenants
    pub is_system: bool,

    /// Owning organization for custom roles, `None` for system roles
    #[serde(default)]
    pub organization_id: Option<Uuid>,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// When the role was created
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Creates a system role.
    pub fn system(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            is_system: true,
            organization_id: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a custom role owned by `organization_id`.
    pub fn custom(organization_id: Uuid, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            is_system: false,
            organization_id: Some(organization_id),
            ..Self::system(name, slug)
        }
    }

    /// Whether members of `organization_id` may be assigned this role.
    pub fn is_available_in(&self, organization_id: Uuid) -> bool {
        self.is_system || self.organization_id == Some(organization_id)
    }

    /// Lightweight view returned by role lookups.
    pub fn summary(&self) -> RoleSummary {
        RoleSummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// Role identity returned by `get_user_role`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Input for creating a custom role.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewRole {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 1, max = 64), custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(length(max = 500))]
    #[serde(default)]
    pub description: Option<String>,

    /// Permissions granted by the role
    #[serde(default)]
    pub permissions: Vec<PermissionKey>,
}

/// Slugs are lowercase ASCII words joined by `-` or `_`.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid_chars = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    let valid_edges = !slug.starts_with(['-', '_']) && !slug.ends_with(['-', '_']);

    if valid_chars && valid_edges {
        Ok(())
    } else {
        Err(ValidationError::new("slug"))
    }
}

/// The seeded system roles.
///
/// The hierarchy is: Member < Staff < Admin < Owner. Each role's bundle is a
/// superset of the bundle of every lower role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    /// Gym member with a staff login (read-only basics)
    Member = 0,

    /// Front desk and trainers
    Staff = 1,

    /// Studio managers
    Admin = 2,

    /// Business owner
    Owner = 3,
}

impl SystemRole {
    /// All system roles, lowest first.
    pub fn all() -> [Self; 4] {
        [Self::Member, Self::Staff, Self::Admin, Self::Owner]
    }

    /// Stable slug stored in the `roles` table.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Staff => "staff",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Member => "Member",
            Self::Staff => "Staff",
            Self::Admin => "Admin",
            Self::Owner => "Owner",
        }
    }

    /// Parse from slug (case-insensitive).
    ///
    /// ```
    /// use gymdesk_rbac::SystemRole;
    ///
    /// assert_eq!(SystemRole::parse("ADMIN"), Some(SystemRole::Admin));
    /// assert_eq!(SystemRole::parse("janitor"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "member" => Some(Self::Member),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Default permission bundle of the role.
    pub fn permissions(&self) -> PermissionSet {
        use Action::*;
        use ResourceType::*;

        let mut set = match self {
            Self::Owner => return PermissionKey::all().into_iter().collect(),
            Self::Member => PermissionSet::new(),
            Self::Staff => Self::Member.permissions(),
            Self::Admin => Self::Staff.permissions(),
        };
        match self {
            Self::Member => {
                set.add_actions(Organization, &[Read]);
                set.add_actions(Locations, &[Read]);
                set.add_actions(Users, &[Read]);
                set.add_actions(Schedule, &[Read]);
            }
            Self::Staff => {
                set.add_actions(Clients, &[Read, Create, Write]);
                set.add_actions(Schedule, &[Create, Write]);
                set.add_actions(Reports, &[Read]);
            }
            Self::Admin => {
                set.add_actions(Organization, &[Write, ManageRoles]);
                set.add_actions(Locations, &[Create, Write, Delete]);
                set.add_actions(Users, &[Create, Write, Delete]);
                set.add_actions(Roles, &[Read]);
                set.add_actions(Clients, &[Delete]);
                set.add_actions(Schedule, &[Delete]);
                set.add_actions(Billing, &[Read, Create, Write]);
                set.add_actions(Settings, &[Read]);
            }
            Self::Owner => {}
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_role_hierarchy() {
        assert!(SystemRole::Owner > SystemRole::Admin);
        assert!(SystemRole::Admin > SystemRole::Staff);
        assert!(SystemRole::Staff > SystemRole::Member);
    }

    #[test]
    fn test_bundles_are_nested() {
        let roles = SystemRole::all();
        for pair in roles.windows(2) {
            let lower = pair[0].permissions();
            let higher = pair[1].permissions();
            assert!(higher.contains_all(&lower), "{:?} should include {:?}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_member_bundle() {
        let member = SystemRole::Member.permissions();
        assert!(member.has(ResourceType::Users, Action::Read));
        assert!(!member.has(ResourceType::Organization, Action::ManageRoles));
        assert!(!member.has(ResourceType::Clients, Action::Read));
    }

    #[test]
    fn test_owner_has_everything() {
        let owner = SystemRole::Owner.permissions();
        assert_eq!(owner.len(), PermissionKey::all().len());
        assert!(!SystemRole::Admin.permissions().has(ResourceType::Organization, Action::Delete));
    }

    #[test]
    fn test_custom_role_availability() {
        let org = Uuid::now_v7();
        let other = Uuid::now_v7();

        let custom = Role::custom(org, "Front Desk", "front-desk");
        assert!(!custom.is_system);
        assert!(custom.is_available_in(org));
        assert!(!custom.is_available_in(other));

        let system = Role::system("Owner", "owner");
        assert!(system.is_available_in(other));
    }

    #[test]
    fn test_slug_validation() {
        assert!(validate_slug("front-desk").is_ok());
        assert!(validate_slug("coach_2").is_ok());
        assert!(validate_slug("Front Desk").is_err());
        assert!(validate_slug("-lead").is_err());
        assert!(validate_slug("trail_").is_err());

        let input = NewRole {
            name: "".to_string(),
            slug: "ok".to_string(),
            description: None,
            permissions: Vec::new(),
        };
        assert!(input.validate().is_err());
    }
}
