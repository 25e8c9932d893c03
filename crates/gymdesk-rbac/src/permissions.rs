//! # Permissions
//!
//! Core permission types for the RBAC system. A permission combines a
//! resource type with an action; roles hold permissions through link rows
//! that carry an explicit `granted` flag.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::actions::Action;
use crate::resources::ResourceType;

/// A `(resource, action)` pair, written `resource:action`.
///
/// # Example
///
/// ```
/// use gymdesk_rbac::{Action, PermissionKey, ResourceType};
///
/// let key = PermissionKey::new(ResourceType::Organization, Action::ManageRoles);
/// assert_eq!(key.to_string(), "organization:manage_roles");
/// assert_eq!(PermissionKey::parse("organization:manage_roles"), Some(key));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionKey {
    /// The resource type this permission applies to.
    pub resource: ResourceType,
    /// The action allowed on the resource.
    pub action: Action,
}

impl PermissionKey {
    /// Create a new permission key.
    pub fn new(resource: ResourceType, action: Action) -> Self {
        Self { resource, action }
    }

    /// Parse from `resource:action` (aliases accepted on both sides).
    pub fn parse(s: &str) -> Option<Self> {
        let (resource, action) = s.split_once(':')?;
        Some(Self {
            resource: ResourceType::parse(resource)?,
            action: Action::parse(action)?,
        })
    }

    /// Every key in the closed resource/action space.
    pub fn all() -> Vec<Self> {
        ResourceType::all()
            .into_iter()
            .flat_map(|resource| Action::all().into_iter().map(move |action| Self::new(resource, action)))
            .collect()
    }
}

impl std::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.action.as_str())
    }
}

/// A permission catalogue entry as stored in the `permissions` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    /// Unique permission ID
    pub id: Uuid,

    /// Resource category
    pub resource: ResourceType,

    /// Action on the resource
    pub action: Action,

    /// Human description shown in role editors
    pub description: String,
}

impl Permission {
    /// Creates a catalogue entry with a generated description.
    pub fn new(resource: ResourceType, action: Action) -> Self {
        Self {
            id: Uuid::now_v7(),
            resource,
            action,
            description: format!("{} {}", action.verb(), resource.display_name()),
        }
    }

    /// The `(resource, action)` pair of this entry.
    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(self.resource, self.action)
    }
}

/// Link row between a role and a catalogue permission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolePermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub permission_id: Uuid,
    /// `false` records an explicit denial.
    pub granted: bool,
}

impl RolePermission {
    pub fn new(role_id: Uuid, permission_id: Uuid, granted: bool) -> Self {
        Self {
            id: Uuid::now_v7(),
            role_id,
            permission_id,
            granted,
        }
    }
}

/// One resolved entry of a user's permission list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionGrant {
    pub resource: ResourceType,
    pub action: Action,
    pub granted: bool,
}

impl PermissionGrant {
    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(self.resource, self.action)
    }
}

/// Action half of a grouped permission listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionGrant {
    pub action: Action,
    pub granted: bool,
}

/// Group a permission list by resource, preserving action order.
///
/// # Example
///
/// ```
/// use gymdesk_rbac::{group_by_resource, Action, PermissionGrant, ResourceType};
///
/// let grants = vec![
///     PermissionGrant { resource: ResourceType::Users, action: Action::Read, granted: true },
///     PermissionGrant { resource: ResourceType::Users, action: Action::Write, granted: false },
/// ];
/// let grouped = group_by_resource(&grants);
/// assert_eq!(grouped[&ResourceType::Users].len(), 2);
/// ```
pub fn group_by_resource(grants: &[PermissionGrant]) -> BTreeMap<ResourceType, Vec<ActionGrant>> {
    let mut grouped: BTreeMap<ResourceType, Vec<ActionGrant>> = BTreeMap::new();
    for grant in grants {
        grouped.entry(grant.resource).or_default().push(ActionGrant {
            action: grant.action,
            granted: grant.granted,
        });
    }
    grouped
}

/// Optional filters for listing the permission catalogue.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionFilter {
    #[serde(default)]
    pub resource: Option<ResourceType>,
    #[serde(default)]
    pub action: Option<Action>,
}

impl PermissionFilter {
    /// Build a filter from raw query-string values.
    ///
    /// Unknown names yield `None` rather than an empty filter, so a typo can
    /// never widen a listing.
    pub fn parse(resource: Option<&str>, action: Option<&str>) -> Option<Self> {
        let resource = match resource {
            Some(s) => Some(ResourceType::parse(s)?),
            None => None,
        };
        let action = match action {
            Some(s) => Some(Action::parse(s)?),
            None => None,
        };
        Some(Self { resource, action })
    }
}

/// An ordered set of permission keys, used to describe role bundles.
///
/// # Example
///
/// ```
/// use gymdesk_rbac::{Action, PermissionKey, PermissionSet, ResourceType};
///
/// let mut set = PermissionSet::new();
/// set.add(PermissionKey::new(ResourceType::Clients, Action::Read));
/// set.add(PermissionKey::new(ResourceType::Clients, Action::Write));
///
/// assert!(set.has(ResourceType::Clients, Action::Read));
/// assert!(!set.has(ResourceType::Clients, Action::Delete));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionSet {
    permissions: BTreeSet<PermissionKey>,
}

impl PermissionSet {
    /// Create a new empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permission to the set.
    pub fn add(&mut self, key: PermissionKey) {
        self.permissions.insert(key);
    }

    /// Add every action in `actions` for `resource`.
    pub fn add_actions(&mut self, resource: ResourceType, actions: &[Action]) {
        for action in actions {
            self.add(PermissionKey::new(resource, *action));
        }
    }

    /// Remove a permission from the set.
    ///
    /// # Returns
    ///
    /// `true` if the permission was present
    pub fn remove(&mut self, key: &PermissionKey) -> bool {
        self.permissions.remove(key)
    }

    /// Check if the set contains a permission.
    pub fn has(&self, resource: ResourceType, action: Action) -> bool {
        self.permissions.contains(&PermissionKey::new(resource, action))
    }

    /// Iterate over the keys in resource, then action order.
    pub fn iter(&self) -> impl Iterator<Item = &PermissionKey> {
        self.permissions.iter()
    }

    /// Create from `resource:action` strings, skipping unparseable entries.
    pub fn from_strings(perms: &[&str]) -> Self {
        perms.iter().filter_map(|p| PermissionKey::parse(p)).collect()
    }

    /// Get the count of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Check if this set contains all permissions from another set.
    pub fn contains_all(&self, other: &PermissionSet) -> bool {
        other.permissions.is_subset(&self.permissions)
    }
}

impl FromIterator<PermissionKey> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionKey>>(iter: T) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_key_parsing() {
        let key = PermissionKey::parse("users:read").unwrap();
        assert_eq!(key.resource, ResourceType::Users);
        assert_eq!(key.action, Action::Read);

        let aliased = PermissionKey::parse("client:edit").unwrap();
        assert_eq!(aliased, PermissionKey::new(ResourceType::Clients, Action::Write));

        assert!(PermissionKey::parse("users").is_none());
        assert!(PermissionKey::parse("users:fly").is_none());
        assert!(PermissionKey::parse("spaceships:read").is_none());
    }

    #[test]
    fn test_permission_key_space_is_closed() {
        let all = PermissionKey::all();
        assert_eq!(all.len(), ResourceType::all().len() * Action::all().len());
    }

    #[test]
    fn test_catalogue_description() {
        let perm = Permission::new(ResourceType::Clients, Action::Write);
        assert_eq!(perm.description, "Edit clients");
        assert_eq!(perm.key().to_string(), "clients:write");
    }

    #[test]
    fn test_group_by_resource() {
        let grants = vec![
            PermissionGrant { resource: ResourceType::Users, action: Action::Read, granted: true },
            PermissionGrant { resource: ResourceType::Clients, action: Action::Read, granted: true },
            PermissionGrant { resource: ResourceType::Clients, action: Action::Delete, granted: false },
        ];
        let grouped = group_by_resource(&grants);

        assert_eq!(grouped.len(), 2);
        assert_eq!(
            grouped[&ResourceType::Clients],
            vec![
                ActionGrant { action: Action::Read, granted: true },
                ActionGrant { action: Action::Delete, granted: false },
            ]
        );

        let json = serde_json::to_value(&grouped).unwrap();
        assert_eq!(json["users"][0]["action"], "read");
    }

    #[test]
    fn test_permission_filter_parse() {
        let filter = PermissionFilter::parse(Some("users"), None).unwrap();
        assert_eq!(filter.resource, Some(ResourceType::Users));
        assert!(filter.action.is_none());

        assert!(PermissionFilter::parse(Some("nope"), None).is_none());
        assert!(PermissionFilter::parse(None, Some("fly")).is_none());
        assert_eq!(PermissionFilter::parse(None, None), Some(PermissionFilter::default()));
    }

    #[test]
    fn test_permission_set() {
        let mut set = PermissionSet::from_strings(&["clients:read", "clients:write", "bogus"]);
        assert_eq!(set.len(), 2);
        assert!(set.has(ResourceType::Clients, Action::Write));

        assert!(set.remove(&PermissionKey::new(ResourceType::Clients, Action::Write)));
        assert!(!set.has(ResourceType::Clients, Action::Write));
    }

    #[test]
    fn test_permission_set_contains_all() {
        let mut big = PermissionSet::new();
        big.add_actions(ResourceType::Schedule, &[Action::Read, Action::Create, Action::Write]);

        let mut small = PermissionSet::new();
        small.add_actions(ResourceType::Schedule, &[Action::Read]);

        assert!(big.contains_all(&small));
        assert!(!small.contains_all(&big));
    }
}
