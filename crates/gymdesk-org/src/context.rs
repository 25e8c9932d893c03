//! Request identity and organization context
//!
//! The identity layer hands every request a [`RequestIdentity`]: the
//! authenticated user, if any, and the organization the request targets, if
//! any. Operations only accept a [`RequestContext`], which exists only when
//! both are present.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OrgError, OrgResult};

/// The user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            first_name: None,
            last_name: None,
        }
    }

    /// Full name when known, the email address otherwise.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

/// Identity attached to an incoming request.
///
/// # Examples
///
/// ```
/// use gymdesk_org::{AuthenticatedUser, RequestIdentity};
/// use uuid::Uuid;
///
/// let anonymous = RequestIdentity::anonymous();
/// assert!(anonymous.require().is_err());
///
/// let user = AuthenticatedUser::new(Uuid::now_v7(), "coach@example.com");
/// let org_id = Uuid::now_v7();
/// let ctx = RequestIdentity::for_user(user, org_id).require().unwrap();
/// assert_eq!(ctx.organization_id, org_id);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdentity {
    #[serde(default)]
    pub user: Option<AuthenticatedUser>,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

impl RequestIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: AuthenticatedUser, organization_id: Uuid) -> Self {
        Self {
            user: Some(user),
            organization_id: Some(organization_id),
        }
    }

    /// Authenticated user, without requiring an organization context.
    pub fn require_user(&self) -> OrgResult<&AuthenticatedUser> {
        self.user
            .as_ref()
            .ok_or_else(|| OrgError::Unauthorized("authentication required".to_string()))
    }

    /// Both user and organization context, or Unauthorized.
    pub fn require(&self) -> OrgResult<RequestContext> {
        let user = self.require_user()?.clone();
        let organization_id = self
            .organization_id
            .ok_or_else(|| OrgError::Unauthorized("no organization context".to_string()))?;
        Ok(RequestContext {
            user,
            organization_id,
        })
    }
}

/// A request that carries both an authenticated user and an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user: AuthenticatedUser,
    pub organization_id: Uuid,
}

impl RequestContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}
