//! Permission resolution
//!
//! Answers "may user U perform action A on resource R within organization
//! O?" by resolving the user's active membership, its role, and the role's
//! permission links. Every call re-reads the store; nothing is cached.
//!
//! Resolution fails closed: a missing membership, a missing role, or a store
//! failure never results in access being granted.

use gymdesk_store::{from_row, from_rows, Query, Row, Store};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::actions::Action;
use crate::error::{RbacError, RbacResult};
use crate::membership::Membership;
use crate::permissions::{Permission, PermissionFilter, PermissionGrant, PermissionKey, RolePermission};
use crate::resources::ResourceType;
use crate::roles::{Role, RoleSummary};
use crate::tables;

/// Read-only permission resolver over a [`Store`].
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver").finish_non_exhaustive()
    }
}

impl PermissionResolver {
    /// Create a resolver reading through `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The authoritative membership for the pair: the most recent active row.
    async fn active_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> RbacResult<Option<Membership>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .eq("organization_id", organization_id)
            .eq("is_active", true);

        let rows = self.store.select(tables::MEMBERSHIPS, &query).await?;
        let memberships: Vec<Membership> = decode_all(tables::MEMBERSHIPS, rows)?;
        Ok(Membership::latest(memberships))
    }

    async fn resolve_role(&self, user_id: Uuid, organization_id: Uuid) -> RbacResult<Option<Role>> {
        let Some(membership) = self.active_membership(user_id, organization_id).await? else {
            debug!("No active membership");
            return Ok(None);
        };

        let row = self
            .store
            .select_one(tables::ROLES, &Query::new().eq("id", membership.role_id))
            .await?;

        match row {
            Some(row) => Ok(Some(decode(tables::ROLES, row)?)),
            None => {
                warn!(role_id = %membership.role_id, "Membership references a missing role");
                Ok(None)
            }
        }
    }

    /// Role of the user's active membership, or `None` when there is none.
    #[instrument(skip(self))]
    pub async fn get_user_role(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> RbacResult<Option<RoleSummary>> {
        Ok(self
            .resolve_role(user_id, organization_id)
            .await?
            .map(|role| role.summary()))
    }

    /// Full `{resource, action, granted}` list for the user's role.
    ///
    /// Empty when the user has no active membership or the role is missing.
    /// The list is sorted by resource, then action, so repeated calls over
    /// unchanged data return identical results.
    #[instrument(skip(self))]
    pub async fn get_user_permissions(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> RbacResult<Vec<PermissionGrant>> {
        match self.resolve_role(user_id, organization_id).await? {
            Some(role) => self.role_grants(role.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Resolved permission list of a role.
    ///
    /// When a role links the same pair more than once, a denial wins.
    pub async fn role_grants(&self, role_id: Uuid) -> RbacResult<Vec<PermissionGrant>> {
        let rows = self
            .store
            .select(tables::ROLE_PERMISSIONS, &Query::new().eq("role_id", role_id))
            .await?;
        let links: Vec<RolePermission> = decode_all(tables::ROLE_PERMISSIONS, rows)?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = links.iter().map(|link| link.permission_id).collect();
        let rows = self
            .store
            .select(tables::PERMISSIONS, &Query::new().in_list("id", &ids))
            .await?;

        let mut catalogue = HashMap::new();
        for row in rows {
            match from_row::<Permission>(row) {
                Ok(permission) => {
                    catalogue.insert(permission.id, permission.key());
                }
                Err(e) => warn!(error = %e, "Skipping permission outside the known space"),
            }
        }

        let mut merged: BTreeMap<PermissionKey, bool> = BTreeMap::new();
        for link in &links {
            let Some(key) = catalogue.get(&link.permission_id) else {
                warn!(permission_id = %link.permission_id, "Role links a missing permission");
                continue;
            };
            merged
                .entry(*key)
                .and_modify(|granted| *granted = *granted && link.granted)
                .or_insert(link.granted);
        }

        Ok(merged
            .into_iter()
            .map(|(key, granted)| PermissionGrant {
                resource: key.resource,
                action: key.action,
                granted,
            })
            .collect())
    }

    /// Whether the user may perform `action` on `resource` in the organization.
    ///
    /// Denial is `false`, never an error. Any resolution failure is logged and
    /// also yields `false`.
    #[instrument(skip(self))]
    pub async fn check_permission(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        resource: ResourceType,
        action: Action,
    ) -> bool {
        match self.get_user_permissions(user_id, organization_id).await {
            Ok(grants) => grants
                .iter()
                .any(|g| g.resource == resource && g.action == action && g.granted),
            Err(e) => {
                error!(error = %e, "Permission resolution failed, denying");
                false
            }
        }
    }

    /// Like [`check_permission`](Self::check_permission), but denial is
    /// [`RbacError::Forbidden`].
    pub async fn require_permission(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        key: PermissionKey,
    ) -> RbacResult<()> {
        if self
            .check_permission(user_id, organization_id, key.resource, key.action)
            .await
        {
            Ok(())
        } else {
            debug!(%user_id, %organization_id, permission = %key, "Permission denied");
            Err(RbacError::Forbidden(key))
        }
    }

    /// Permission catalogue, optionally filtered, ordered by resource then
    /// action.
    #[instrument(skip(self))]
    pub async fn list_permissions(&self, filter: &PermissionFilter) -> RbacResult<Vec<Permission>> {
        let mut query = Query::new();
        if let Some(resource) = filter.resource {
            query = query.eq("resource", resource);
        }
        if let Some(action) = filter.action {
            query = query.eq("action", action);
        }

        let rows = self.store.select(tables::PERMISSIONS, &query).await?;
        let mut permissions: Vec<Permission> = rows
            .into_iter()
            .filter_map(|row| match from_row::<Permission>(row) {
                Ok(permission) => Some(permission),
                Err(e) => {
                    warn!(error = %e, "Skipping permission outside the known space");
                    None
                }
            })
            .collect();
        permissions.sort_by_key(|p| p.key());
        Ok(permissions)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(table: &'static str, row: Row) -> RbacResult<T> {
    from_row(row).map_err(|e| RbacError::InvalidRow {
        table,
        message: e.to_string(),
    })
}

pub(crate) fn decode_all<T: DeserializeOwned>(table: &'static str, rows: Vec<Row>) -> RbacResult<Vec<T>> {
    from_rows(rows).map_err(|e| RbacError::InvalidRow {
        table,
        message: e.to_string(),
    })
}
