//! Organization domain models
//!
//! Organizations form a forest through `parent_id`. Children are derived by
//! querying on `parent_id` and are never stored on the parent row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{OrgError, OrgResult};
use crate::location::Location;
use crate::settings::OrganizationSettings;

/// A gym business, franchise, or branch.
///
/// ```text
/// Organization
///   ├─ parent (optional)
///   ├─ children (derived)
///   ├─ Locations
///   └─ Settings
/// ```
///
/// # Examples
///
/// ```
/// use gymdesk_org::Organization;
///
/// let franchise = Organization::new("Iron Works");
/// let branch = Organization::new("Iron Works Downtown").with_parent(franchise.id);
/// assert!(franchise.is_root());
/// assert_eq!(branch.parent_id, Some(franchise.id));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Parent organization; `None` for a root
    #[serde(default)]
    pub parent_id: Option<Uuid>,

    /// Organization-level settings
    #[serde(default)]
    pub settings: OrganizationSettings,

    /// Bumped on every hierarchy change
    #[serde(default)]
    pub version: i64,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a root organization with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            parent_id: None,
            settings: OrganizationSettings::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_settings(mut self, settings: OrganizationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn summary(&self) -> OrganizationSummary {
        OrganizationSummary {
            id: self.id,
            name: self.name.clone(),
            parent_id: self.parent_id,
        }
    }
}

/// Lightweight view of an organization used in hierarchy listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

/// Input for creating an organization.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewOrganization {
    #[validate(length(min = 1, max = 255), custom(function = "crate::location::not_blank"))]
    pub name: String,

    #[serde(default)]
    pub parent_id: Option<Uuid>,

    #[serde(default)]
    #[validate(nested)]
    pub settings: OrganizationSettings,
}

impl NewOrganization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
            settings: OrganizationSettings::default(),
        }
    }

    pub fn under(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Re-parenting request. `None` detaches the organization into a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOrganization {
    pub new_parent_id: Option<Uuid>,
}

impl MoveOrganization {
    pub fn to(parent_id: Uuid) -> Self {
        Self {
            new_parent_id: Some(parent_id),
        }
    }

    pub fn to_root() -> Self {
        Self { new_parent_id: None }
    }

    /// Decode a move payload. The `new_parent_id` key must be present; an
    /// explicit `null` requests a detach.
    pub fn from_json(value: serde_json::Value) -> OrgResult<Self> {
        let present = value
            .as_object()
            .is_some_and(|object| object.contains_key("new_parent_id"));
        if !present {
            return Err(OrgError::Validation(
                "new_parent_id is required (use null to detach)".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Options for [`crate::OrganizationService::get_organization_by_id`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOrganizationOptions {
    #[serde(default)]
    pub include_locations: bool,
}

impl GetOrganizationOptions {
    pub fn with_locations() -> Self {
        Self {
            include_locations: true,
        }
    }
}

/// An organization, optionally joined with its locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationDetails {
    #[serde(flatten)]
    pub organization: Organization,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_organization_creation() {
        let org = Organization::new("Iron Works");
        assert_eq!(org.name, "Iron Works");
        assert!(org.is_root());
        assert_eq!(org.version, 0);
        assert_eq!(org.created_at, org.updated_at);
    }

    #[test]
    fn test_row_without_settings_decodes() {
        let org = Organization::new("Iron Works");
        let mut row = serde_json::to_value(&org).unwrap();
        row.as_object_mut().unwrap().remove("settings");
        row.as_object_mut().unwrap().remove("version");

        let decoded: Organization = serde_json::from_value(row).unwrap();
        assert_eq!(decoded.settings, OrganizationSettings::default());
        assert_eq!(decoded.version, 0);
    }

    #[test]
    fn test_new_organization_validation() {
        assert!(NewOrganization::new("Iron Works").validate().is_ok());
        assert!(NewOrganization::new("").validate().is_err());
        assert!(NewOrganization::new("   ").validate().is_err());
    }

    #[test]
    fn test_move_payload() {
        let parent = Uuid::now_v7();
        let request = MoveOrganization::from_json(json!({"new_parent_id": parent})).unwrap();
        assert_eq!(request, MoveOrganization::to(parent));

        let request = MoveOrganization::from_json(json!({"new_parent_id": null})).unwrap();
        assert_eq!(request, MoveOrganization::to_root());

        assert!(MoveOrganization::from_json(json!({})).is_err());
        assert!(MoveOrganization::from_json(json!({"new_parent_id": "nope"})).is_err());
    }

    #[test]
    fn test_details_flatten() {
        let org = Organization::new("Iron Works");
        let details = OrganizationDetails {
            organization: org.clone(),
            locations: None,
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["id"], json!(org.id));
        assert!(json.get("locations").is_none());
    }
}
