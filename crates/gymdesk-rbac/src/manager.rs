//! Role and membership administration
//!
//! Mutations here are gated on `organization:manage_roles` for the acting
//! user within the target organization.

use gymdesk_store::{to_row, Query, Row, Store};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::actions::Action;
use crate::error::{RbacError, RbacResult};
use crate::membership::Membership;
use crate::permissions::{Permission, PermissionKey, RolePermission};
use crate::resolver::{decode, decode_all, PermissionResolver};
use crate::resources::ResourceType;
use crate::roles::{NewRole, Role};
use crate::tables;

const MANAGE_ROLES: PermissionKey = PermissionKey {
    resource: ResourceType::Organization,
    action: Action::ManageRoles,
};

/// Administrative operations on roles and memberships.
#[derive(Clone)]
pub struct RoleManager {
    store: Arc<dyn Store>,
    resolver: PermissionResolver,
}

impl std::fmt::Debug for RoleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleManager").finish_non_exhaustive()
    }
}

impl RoleManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            resolver: PermissionResolver::new(store.clone()),
            store,
        }
    }

    /// Define a custom role for one organization.
    ///
    /// The slug must not clash with a system role or another custom role of
    /// the same organization. Every requested permission must exist in the
    /// catalogue; nothing is written otherwise.
    ///
    /// The role row is written last, so a failure part way leaves at most
    /// unreferenced permission links and never a role without its grants.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_custom_role(
        &self,
        acting_user_id: Uuid,
        organization_id: Uuid,
        input: NewRole,
    ) -> RbacResult<Role> {
        input.validate()?;
        self.resolver
            .require_permission(acting_user_id, organization_id, MANAGE_ROLES)
            .await?;

        let clashes = self
            .store
            .select(tables::ROLES, &Query::new().eq("slug", &input.slug))
            .await?;
        for row in clashes {
            let role: Role = decode(tables::ROLES, row)?;
            if role.is_available_in(organization_id) {
                return Err(RbacError::Validation(format!(
                    "slug '{}' is already in use",
                    input.slug
                )));
            }
        }

        let requested: BTreeSet<PermissionKey> = input.permissions.iter().copied().collect();
        let mut permission_ids = Vec::with_capacity(requested.len());
        for key in requested {
            let query = Query::new().eq("resource", key.resource).eq("action", key.action);
            let row = self
                .store
                .select_one(tables::PERMISSIONS, &query)
                .await?
                .ok_or_else(|| RbacError::not_found("permission", key))?;
            let permission: Permission = decode(tables::PERMISSIONS, row)?;
            permission_ids.push(permission.id);
        }

        let mut role = Role::custom(organization_id, input.name, input.slug);
        role.description = input.description;

        // Links go in first: until the role row exists they match nothing.
        for permission_id in permission_ids {
            let link = RolePermission::new(role.id, permission_id, true);
            self.store
                .insert(tables::ROLE_PERMISSIONS, to_row(&link)?)
                .await?;
        }
        self.store.insert(tables::ROLES, to_row(&role)?).await?;

        info!(role_id = %role.id, %organization_id, "Created custom role");
        Ok(role)
    }

    /// Give `user_id` the role `role_id` within the organization.
    ///
    /// Reuses (and reactivates) the user's latest membership row when one
    /// exists; any other active row for the pair is deactivated so exactly
    /// one remains authoritative.
    #[instrument(skip(self))]
    pub async fn assign_role(
        &self,
        acting_user_id: Uuid,
        organization_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> RbacResult<Membership> {
        self.resolver
            .require_permission(acting_user_id, organization_id, MANAGE_ROLES)
            .await?;

        let role: Role = self
            .store
            .select_one(tables::ROLES, &Query::new().eq("id", role_id))
            .await?
            .map(|row| decode(tables::ROLES, row))
            .transpose()?
            .filter(|role: &Role| role.is_available_in(organization_id))
            .ok_or_else(|| RbacError::not_found("role", role_id))?;

        let pair = Query::new()
            .eq("user_id", user_id)
            .eq("organization_id", organization_id);
        let rows = self.store.select(tables::MEMBERSHIPS, &pair).await?;
        let existing = Membership::latest(decode_all::<Membership>(tables::MEMBERSHIPS, rows)?);

        let Some(existing) = existing else {
            let membership =
                Membership::new(user_id, organization_id, role.id).with_inviter(acting_user_id);
            self.store
                .insert(tables::MEMBERSHIPS, to_row(&membership)?)
                .await?;
            info!(membership_id = %membership.id, role = %role.slug, "Created membership");
            return Ok(membership);
        };

        let others = Query::new()
            .eq("user_id", user_id)
            .eq("organization_id", organization_id)
            .eq("is_active", true)
            .neq("id", existing.id);
        self.store
            .update(tables::MEMBERSHIPS, &others, patch([("is_active", json!(false))]))
            .await?;

        let updated = self
            .store
            .update(
                tables::MEMBERSHIPS,
                &Query::new().eq("id", existing.id),
                patch([("role_id", json!(role.id)), ("is_active", json!(true))]),
            )
            .await?;
        let membership = updated
            .into_iter()
            .next()
            .map(|row| decode(tables::MEMBERSHIPS, row))
            .transpose()?
            .ok_or_else(|| RbacError::not_found("membership", existing.id))?;

        info!(membership_id = %existing.id, role = %role.slug, "Changed membership role");
        Ok(membership)
    }

    /// Deactivate the user's active membership in the organization.
    #[instrument(skip(self))]
    pub async fn deactivate_membership(
        &self,
        acting_user_id: Uuid,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> RbacResult<Membership> {
        self.resolver
            .require_permission(acting_user_id, organization_id, MANAGE_ROLES)
            .await?;

        let active = Query::new()
            .eq("user_id", user_id)
            .eq("organization_id", organization_id)
            .eq("is_active", true);
        let updated = self
            .store
            .update(tables::MEMBERSHIPS, &active, patch([("is_active", json!(false))]))
            .await?;

        let membership = updated
            .into_iter()
            .next()
            .map(|row| decode(tables::MEMBERSHIPS, row))
            .transpose()?
            .ok_or_else(|| RbacError::not_found("membership", user_id))?;

        info!(%user_id, %organization_id, "Deactivated membership");
        Ok(membership)
    }
}

fn patch<const N: usize>(fields: [(&str, serde_json::Value); N]) -> Row {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::SystemRole;
    use crate::seed::seed_system_roles;
    use gymdesk_store::{MemoryStore, StoreError, StoreResult};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        store: Arc<MemoryStore>,
        manager: RoleManager,
        resolver: PermissionResolver,
        roles: HashMap<SystemRole, Role>,
        org: Uuid,
        admin: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let roles = seed_system_roles(store.as_ref()).await.unwrap();
        let org = Uuid::now_v7();
        let admin = Uuid::now_v7();
        let membership = Membership::new(admin, org, roles[&SystemRole::Admin].id);
        store
            .insert(tables::MEMBERSHIPS, to_row(&membership).unwrap())
            .await
            .unwrap();

        Fixture {
            manager: RoleManager::new(store.clone()),
            resolver: PermissionResolver::new(store.clone()),
            store,
            roles,
            org,
            admin,
        }
    }

    fn front_desk() -> NewRole {
        NewRole {
            name: "Front Desk".to_string(),
            slug: "front-desk".to_string(),
            description: Some("Check-ins and client records".to_string()),
            permissions: vec![
                PermissionKey::new(ResourceType::Clients, Action::Read),
                PermissionKey::new(ResourceType::Clients, Action::Create),
                PermissionKey::new(ResourceType::Clients, Action::Read),
            ],
        }
    }

    #[tokio::test]
    async fn test_create_custom_role_and_assign() {
        let fx = fixture().await;
        let role = fx
            .manager
            .create_custom_role(fx.admin, fx.org, front_desk())
            .await
            .unwrap();
        assert!(!role.is_system);
        assert_eq!(role.organization_id, Some(fx.org));

        let grants = fx.resolver.role_grants(role.id).await.unwrap();
        assert_eq!(grants.len(), 2);

        let user = Uuid::now_v7();
        let membership = fx.manager.assign_role(fx.admin, fx.org, user, role.id).await.unwrap();
        assert_eq!(membership.invited_by, Some(fx.admin));

        assert!(
            fx.resolver
                .check_permission(user, fx.org, ResourceType::Clients, Action::Create)
                .await
        );
        assert!(
            !fx.resolver
                .check_permission(user, fx.org, ResourceType::Clients, Action::Delete)
                .await
        );
    }

    /// Memory store that can be told to reject permission-link inserts.
    struct LinkRejectingStore {
        inner: Arc<MemoryStore>,
        reject_links: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Store for LinkRejectingStore {
        async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
            self.inner.select(table, query).await
        }

        async fn insert(&self, table: &str, row: Row) -> StoreResult<Row> {
            if table == tables::ROLE_PERMISSIONS && self.reject_links.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("write timeout".to_string()));
            }
            self.inner.insert(table, row).await
        }

        async fn update(&self, table: &str, query: &Query, patch: Row) -> StoreResult<Vec<Row>> {
            self.inner.update(table, query, patch).await
        }
    }

    #[tokio::test]
    async fn test_failed_link_write_leaves_no_role() {
        let fx = fixture().await;
        let store = Arc::new(LinkRejectingStore {
            inner: fx.store.clone(),
            reject_links: AtomicBool::new(true),
        });
        let manager = RoleManager::new(store.clone());
        let roles_before = fx.store.count(tables::ROLES).await;

        let err = manager
            .create_custom_role(fx.admin, fx.org, front_desk())
            .await
            .unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(fx.store.count(tables::ROLES).await, roles_before);
        let leftover = fx
            .store
            .select(tables::ROLES, &Query::new().eq("slug", "front-desk"))
            .await
            .unwrap();
        assert!(leftover.is_empty());

        store.reject_links.store(false, Ordering::SeqCst);
        let role = manager
            .create_custom_role(fx.admin, fx.org, front_desk())
            .await
            .unwrap();
        assert_eq!(fx.resolver.role_grants(role.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_assign_role_updates_most_recent_membership() {
        let fx = fixture().await;
        let user = Uuid::now_v7();
        let base = "2026-03-01T09:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap();

        let mut older = Membership::new(user, fx.org, fx.roles[&SystemRole::Member].id).deactivated();
        older.joined_at = base;
        let mut newer = Membership::new(user, fx.org, fx.roles[&SystemRole::Member].id).deactivated();
        newer.joined_at = base + chrono::Duration::milliseconds(250);
        for membership in [&newer, &older] {
            fx.store
                .insert(tables::MEMBERSHIPS, to_row(membership).unwrap())
                .await
                .unwrap();
        }

        let staff = fx.roles[&SystemRole::Staff].id;
        let assigned = fx.manager.assign_role(fx.admin, fx.org, user, staff).await.unwrap();
        assert_eq!(assigned.id, newer.id);
        assert!(assigned.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let fx = fixture().await;
        let mut input = front_desk();
        input.slug = "staff".to_string();

        let err = fx
            .manager
            .create_custom_role(fx.admin, fx.org, input)
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::Validation(_)));
    }

    #[tokio::test]
    async fn test_requires_manage_roles() {
        let fx = fixture().await;
        let outsider = Uuid::now_v7();
        let roles_before = fx.store.count(tables::ROLES).await;

        let err = fx
            .manager
            .create_custom_role(outsider, fx.org, front_desk())
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::Forbidden(key) if key == MANAGE_ROLES));
        assert_eq!(fx.store.count(tables::ROLES).await, roles_before);
    }

    #[tokio::test]
    async fn test_reassign_keeps_single_active_membership() {
        let fx = fixture().await;
        let user = Uuid::now_v7();
        let member = fx.roles[&SystemRole::Member].id;
        let staff = fx.roles[&SystemRole::Staff].id;

        let first = fx.manager.assign_role(fx.admin, fx.org, user, member).await.unwrap();
        let second = fx.manager.assign_role(fx.admin, fx.org, user, staff).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.role_id, staff);

        let role = fx.resolver.get_user_role(user, fx.org).await.unwrap().unwrap();
        assert_eq!(role.slug, "staff");
    }

    #[tokio::test]
    async fn test_foreign_custom_role_not_assignable() {
        let fx = fixture().await;
        let role = fx
            .manager
            .create_custom_role(fx.admin, fx.org, front_desk())
            .await
            .unwrap();

        let other_org = Uuid::now_v7();
        let owner = Membership::new(fx.admin, other_org, fx.roles[&SystemRole::Owner].id);
        fx.store
            .insert(tables::MEMBERSHIPS, to_row(&owner).unwrap())
            .await
            .unwrap();

        let err = fx
            .manager
            .assign_role(fx.admin, other_org, Uuid::now_v7(), role.id)
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::NotFound { entity: "role", .. }));
    }

    #[tokio::test]
    async fn test_deactivate_membership() {
        let fx = fixture().await;
        let user = Uuid::now_v7();
        let staff = fx.roles[&SystemRole::Staff].id;
        fx.manager.assign_role(fx.admin, fx.org, user, staff).await.unwrap();

        let membership = fx
            .manager
            .deactivate_membership(fx.admin, fx.org, user)
            .await
            .unwrap();
        assert!(!membership.is_active);
        assert!(fx.resolver.get_user_permissions(user, fx.org).await.unwrap().is_empty());

        let err = fx
            .manager
            .deactivate_membership(fx.admin, fx.org, user)
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::NotFound { .. }));
    }
}
