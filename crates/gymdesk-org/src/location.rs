//! Physical locations owned by an organization

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::OrgResult;

/// A physical site (gym floor, studio, pool) belonging to one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,

    /// Owning organization; fixed at creation
    pub organization_id: Uuid,

    pub name: String,

    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    /// User who created the location
    #[serde(default)]
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Location {
    /// Build the row for a validated creation request.
    pub fn from_input(input: NewLocation, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id: input.organization_id,
            name: input.name.trim().to_string(),
            address_line1: input.address_line1,
            address_line2: input.address_line2,
            city: input.city,
            region: input.region,
            postal_code: input.postal_code,
            country: input.country,
            phone: input.phone,
            email: input.email,
            is_active: true,
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a location.
///
/// # Examples
///
/// ```
/// use gymdesk_org::NewLocation;
/// use uuid::Uuid;
/// use validator::Validate;
///
/// let input = NewLocation::new(Uuid::now_v7(), "Main");
/// assert!(input.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewLocation {
    pub organization_id: Uuid,

    #[validate(length(min = 1, max = 255), custom(function = "not_blank"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 255))]
    pub address_line1: Option<String>,

    #[serde(default)]
    #[validate(length(max = 255))]
    pub address_line2: Option<String>,

    #[serde(default)]
    #[validate(length(max = 128))]
    pub city: Option<String>,

    #[serde(default)]
    #[validate(length(max = 128))]
    pub region: Option<String>,

    #[serde(default)]
    #[validate(length(max = 32))]
    pub postal_code: Option<String>,

    #[serde(default)]
    #[validate(length(min = 2, max = 2))]
    pub country: Option<String>,

    #[serde(default)]
    #[validate(length(max = 32))]
    pub phone: Option<String>,

    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
}

impl NewLocation {
    pub fn new(organization_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            organization_id,
            name: name.into(),
            address_line1: None,
            address_line2: None,
            city: None,
            region: None,
            postal_code: None,
            country: None,
            phone: None,
            email: None,
        }
    }

    /// Decode a creation payload. Shape errors and rule violations both
    /// surface as validation errors.
    pub fn from_json(value: serde_json::Value) -> OrgResult<Self> {
        let input: Self = serde_json::from_value(value)?;
        input.validate()?;
        Ok(input)
    }
}

/// Rejects names made only of whitespace.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrgError;
    use serde_json::json;

    #[test]
    fn test_from_json_minimal() {
        let org = Uuid::now_v7();
        let input = NewLocation::from_json(json!({"organization_id": org, "name": "Main"})).unwrap();
        assert_eq!(input.organization_id, org);
        assert!(input.city.is_none());
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        let org = Uuid::now_v7();
        let cases = [
            json!({"name": "Main"}),
            json!({"organization_id": org}),
            json!({"organization_id": org, "name": ""}),
            json!({"organization_id": org, "name": "  "}),
            json!({"organization_id": "not-a-uuid", "name": "Main"}),
            json!({"organization_id": org, "name": "Main", "country": "USA"}),
            json!({"organization_id": org, "name": "Main", "email": "front desk"}),
            json!({"organization_id": org, "name": "Main", "floor": 2}),
        ];
        for case in cases {
            let err = NewLocation::from_json(case.clone()).unwrap_err();
            assert!(matches!(err, OrgError::Validation(_)), "accepted {case}");
        }
    }

    #[test]
    fn test_from_input_trims_name() {
        let mut input = NewLocation::new(Uuid::now_v7(), "  Riverside  ");
        input.city = Some("Portland".to_string());
        let creator = Uuid::now_v7();

        let location = Location::from_input(input, creator);
        assert_eq!(location.name, "Riverside");
        assert_eq!(location.city.as_deref(), Some("Portland"));
        assert_eq!(location.created_by, Some(creator));
        assert!(location.is_active);
    }
}
