//! # Actions
//!
//! Operations a role may be granted on a back-office resource. Anything
//! not listed here cannot be granted.

use serde::{Deserialize, Serialize};

/// Operation half of a permission.
///
/// - **Read**: list and view records
/// - **Create**: add records (clients, classes, locations)
/// - **Write**: edit existing records
/// - **Delete**: remove records
/// - **ManageRoles**: assign roles and define custom roles
///
/// Actions do not imply one another. A role holding `write` on a resource
/// does not implicitly hold `read`; every granted pair is listed explicitly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,

    Create,

    Write,

    Delete,

    /// Covers memberships as well as role definitions
    ManageRoles,
}

impl Action {
    /// Wire name, as stored in the permission catalogue.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Write => "write",
            Action::Delete => "delete",
            Action::ManageRoles => "manage_roles",
        }
    }

    /// Parse a wire name or one of its aliases, ignoring case.
    ///
    /// # Example
    ///
    /// ```
    /// use gymdesk_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("read"), Some(Action::Read));
    /// assert_eq!(Action::parse("view"), Some(Action::Read)); // Alias
    /// assert_eq!(Action::parse("update"), Some(Action::Write)); // Alias
    /// assert_eq!(Action::parse("manage_roles"), Some(Action::ManageRoles));
    /// assert_eq!(Action::parse("teleport"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" | "view" | "get" => Some(Action::Read),
            "create" | "add" | "new" => Some(Action::Create),
            "write" | "update" | "edit" | "modify" => Some(Action::Write),
            "delete" | "remove" | "destroy" => Some(Action::Delete),
            "manage_roles" | "manage-roles" | "manageroles" => Some(Action::ManageRoles),
            _ => None,
        }
    }

    /// Every action, in declaration order.
    pub fn all() -> Vec<Self> {
        vec![
            Action::Read,
            Action::Create,
            Action::Write,
            Action::Delete,
            Action::ManageRoles,
        ]
    }

    /// Verb used in generated permission descriptions.
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Read => "View",
            Action::Create => "Create",
            Action::Write => "Edit",
            Action::Delete => "Delete",
            Action::ManageRoles => "Manage roles for",
        }
    }

    /// Check if this is a destructive action.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Action::Delete)
    }

    /// Check if this is a read-only action.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Action::Read)
    }

    /// Check if this action modifies data.
    pub fn is_write(&self) -> bool {
        matches!(self, Action::Create | Action::Write | Action::Delete)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
