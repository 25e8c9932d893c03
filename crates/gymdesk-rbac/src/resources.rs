//! # Resource Types
//!
//! Defines the coarse resource categories permissions are granted on.

use serde::{Deserialize, Serialize};

/// Resource types that can have permissions assigned.
///
/// The set is closed and mirrors the areas of the studio back office:
/// organization structure, staff and roles, client records, scheduling,
/// billing and reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// The organization itself and its place in the hierarchy.
    Organization,
    /// Physical locations owned by an organization.
    Locations,
    /// Staff accounts and memberships.
    Users,
    /// Role definitions.
    Roles,
    /// Client (customer) records.
    Clients,
    /// Classes, appointments and calendars.
    Schedule,
    /// Invoices, payments and plans.
    Billing,
    /// Financial and attendance reports.
    Reports,
    /// Organization settings and feature flags.
    Settings,
}

impl ResourceType {
    /// Get the string representation of the resource type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Organization => "organization",
            ResourceType::Locations => "locations",
            ResourceType::Users => "users",
            ResourceType::Roles => "roles",
            ResourceType::Clients => "clients",
            ResourceType::Schedule => "schedule",
            ResourceType::Billing => "billing",
            ResourceType::Reports => "reports",
            ResourceType::Settings => "settings",
        }
    }

    /// Human-readable noun used in permission descriptions.
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceType::Organization => "organization",
            ResourceType::Locations => "locations",
            ResourceType::Users => "staff users",
            ResourceType::Roles => "roles",
            ResourceType::Clients => "clients",
            ResourceType::Schedule => "schedule",
            ResourceType::Billing => "billing",
            ResourceType::Reports => "reports",
            ResourceType::Settings => "settings",
        }
    }

    /// Parse resource type from string representation.
    ///
    /// # Example
    ///
    /// ```
    /// use gymdesk_rbac::resources::ResourceType;
    ///
    /// assert_eq!(ResourceType::parse("users"), Some(ResourceType::Users));
    /// assert_eq!(ResourceType::parse("user"), Some(ResourceType::Users));
    /// assert_eq!(ResourceType::parse("Organization"), Some(ResourceType::Organization));
    /// assert_eq!(ResourceType::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "organization" | "organizations" | "org" => Some(ResourceType::Organization),
            "locations" | "location" => Some(ResourceType::Locations),
            "users" | "user" | "staff" => Some(ResourceType::Users),
            "roles" | "role" => Some(ResourceType::Roles),
            "clients" | "client" | "members" => Some(ResourceType::Clients),
            "schedule" | "scheduling" | "classes" => Some(ResourceType::Schedule),
            "billing" | "finance" | "payments" => Some(ResourceType::Billing),
            "reports" | "report" | "analytics" => Some(ResourceType::Reports),
            "settings" | "setting" => Some(ResourceType::Settings),
            _ => None,
        }
    }

    /// Get all resource types.
    pub fn all() -> Vec<Self> {
        vec![
            ResourceType::Organization,
            ResourceType::Locations,
            ResourceType::Users,
            ResourceType::Roles,
            ResourceType::Clients,
            ResourceType::Schedule,
            ResourceType::Billing,
            ResourceType::Reports,
            ResourceType::Settings,
        ]
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
