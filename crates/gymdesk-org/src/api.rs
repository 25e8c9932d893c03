//! Transport-free request handlers
//!
//! Each function takes the request identity plus decoded arguments and
//! returns either the response body or an [`ErrorPayload`]. A web layer maps
//! the payload to a status with [`OrgError::status_code`].
//!
//! | handler                        | route                                 |
//! |--------------------------------|---------------------------------------|
//! | [`get_organization`]           | `GET organization/{id}`               |
//! | [`get_organization_hierarchy`] | `GET organization/{id}/hierarchy`     |
//! | [`create_location`]            | `POST organization/{id}/locations`    |
//! | [`move_organization`]          | `POST organization/{id}/move`         |
//! | [`list_permissions`]           | `GET permissions?resource&action`     |
//! | [`get_user_permissions`]       | `GET users/{user_id}/permissions`     |

use gymdesk_rbac::{group_by_resource, Action, ActionGrant, Permission, PermissionFilter, ResourceType};
use std::collections::BTreeMap;
use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::context::RequestIdentity;
use crate::error::{ErrorPayload, OrgError, OrgResult};
use crate::hierarchy::OrganizationHierarchy;
use crate::location::{Location, NewLocation};
use crate::organization::{GetOrganizationOptions, MoveOrganization, Organization, OrganizationDetails};
use crate::service::OrganizationService;

/// Handler result.
pub type ApiResult<T> = Result<T, ErrorPayload>;

/// Permissions grouped by resource.
pub type GroupedPermissions = BTreeMap<ResourceType, Vec<ActionGrant>>;

fn respond<T>(route: &'static str, result: OrgResult<T>) -> ApiResult<T> {
    result.map_err(|e| {
        if e.is_server_error() {
            error!(route, error = %e, "Request failed");
        } else {
            warn!(route, code = e.error_code(), error = %e, "Request rejected");
        }
        e.to_payload()
    })
}

/// `GET organization/{id}`
pub async fn get_organization(
    service: &OrganizationService,
    identity: &RequestIdentity,
    id: Uuid,
    options: GetOrganizationOptions,
) -> ApiResult<OrganizationDetails> {
    let result = async {
        let ctx = identity.require()?;
        service
            .authorize(ctx.user_id(), id, ResourceType::Organization, Action::Read)
            .await?;
        if options.include_locations {
            service
                .authorize(ctx.user_id(), id, ResourceType::Locations, Action::Read)
                .await?;
        }
        service.get_organization_by_id(id, options).await
    }
    .instrument(info_span!("get_organization", %id))
    .await;
    respond("get_organization", result)
}

/// `GET organization/{id}/hierarchy`
pub async fn get_organization_hierarchy(
    service: &OrganizationService,
    identity: &RequestIdentity,
    id: Uuid,
) -> ApiResult<OrganizationHierarchy> {
    let result = async {
        let ctx = identity.require()?;
        service
            .authorize(ctx.user_id(), id, ResourceType::Organization, Action::Read)
            .await?;
        service.get_organization_hierarchy(id).await
    }
    .instrument(info_span!("get_organization_hierarchy", %id))
    .await;
    respond("get_organization_hierarchy", result)
}

/// `POST organization/{id}/locations`
///
/// The body's `organization_id`, when it disagrees with the path, is a
/// validation error.
pub async fn create_location(
    service: &OrganizationService,
    identity: &RequestIdentity,
    organization_id: Uuid,
    body: serde_json::Value,
) -> ApiResult<Location> {
    let result = async {
        let ctx = identity.require()?;
        let input = NewLocation::from_json(body)?;
        if input.organization_id != organization_id {
            return Err(OrgError::Validation(
                "organization_id does not match the request path".to_string(),
            ));
        }
        service.create_location(input, ctx.user_id()).await
    }
    .instrument(info_span!("create_location", %organization_id))
    .await;
    respond("create_location", result)
}

/// `POST organization/{id}/move`
pub async fn move_organization(
    service: &OrganizationService,
    identity: &RequestIdentity,
    id: Uuid,
    body: serde_json::Value,
) -> ApiResult<Organization> {
    let result = async {
        let ctx = identity.require()?;
        let request = MoveOrganization::from_json(body)?;
        service.move_organization(id, request, ctx.user_id()).await
    }
    .instrument(info_span!("move_organization", %id))
    .await;
    respond("move_organization", result)
}

/// `GET permissions?resource&action`
///
/// Unknown resource or action names are validation errors rather than empty
/// results.
pub async fn list_permissions(
    service: &OrganizationService,
    identity: &RequestIdentity,
    resource: Option<&str>,
    action: Option<&str>,
) -> ApiResult<Vec<Permission>> {
    let result = async {
        identity.require()?;
        let filter = PermissionFilter::parse(resource, action).ok_or_else(|| {
            OrgError::Validation(format!(
                "unknown permission filter: resource={:?} action={:?}",
                resource, action
            ))
        })?;
        Ok::<_, OrgError>(service.resolver().list_permissions(&filter).await?)
    }
    .instrument(info_span!("list_permissions"))
    .await;
    respond("list_permissions", result)
}

/// `GET users/{user_id}/permissions`
///
/// Resolved within the request's organization. Reading another user's
/// permissions requires `users:read`.
pub async fn get_user_permissions(
    service: &OrganizationService,
    identity: &RequestIdentity,
    user_id: Uuid,
) -> ApiResult<GroupedPermissions> {
    let result = async {
        let ctx = identity.require()?;
        if user_id != ctx.user_id() {
            service
                .authorize(ctx.user_id(), ctx.organization_id, ResourceType::Users, Action::Read)
                .await?;
        }
        let grants = service
            .resolver()
            .get_user_permissions(user_id, ctx.organization_id)
            .await?;
        Ok::<_, OrgError>(group_by_resource(&grants))
    }
    .instrument(info_span!("get_user_permissions", %user_id))
    .await;
    respond("get_user_permissions", result)
}
