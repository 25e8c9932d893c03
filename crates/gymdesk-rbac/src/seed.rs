//! Seed data
//!
//! Inserts the permission catalogue and the system roles. Seeding is
//! idempotent: existing catalogue entries and system roles are reused.

use gymdesk_store::{to_row, Query, Store};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::{RbacError, RbacResult};
use crate::permissions::{Permission, PermissionKey, RolePermission};
use crate::resolver::decode;
use crate::roles::{Role, SystemRole};
use crate::tables;

/// Seed the catalogue and the system roles, returning the roles by kind.
pub async fn seed_system_roles(store: &dyn Store) -> RbacResult<HashMap<SystemRole, Role>> {
    let mut catalogue = HashMap::new();
    for row in store.select(tables::PERMISSIONS, &Query::new()).await? {
        match decode::<Permission>(tables::PERMISSIONS, row) {
            Ok(permission) => {
                catalogue.insert(permission.key(), permission.id);
            }
            Err(e) => warn!(error = %e, "Ignoring unrecognised catalogue row"),
        }
    }

    let mut inserted = 0;
    for key in PermissionKey::all() {
        if catalogue.contains_key(&key) {
            continue;
        }
        let permission = Permission::new(key.resource, key.action);
        store.insert(tables::PERMISSIONS, to_row(&permission)?).await?;
        catalogue.insert(key, permission.id);
        inserted += 1;
    }

    let mut roles = HashMap::new();
    for kind in SystemRole::all() {
        let query = Query::new().eq("slug", kind.slug()).eq("is_system", true);
        if let Some(row) = store.select_one(tables::ROLES, &query).await? {
            roles.insert(kind, decode::<Role>(tables::ROLES, row)?);
            continue;
        }

        let role = Role::system(kind.display_name(), kind.slug());
        store.insert(tables::ROLES, to_row(&role)?).await?;

        for key in kind.permissions().iter() {
            let permission_id = catalogue
                .get(key)
                .copied()
                .ok_or_else(|| RbacError::not_found("permission", key))?;
            let link = RolePermission::new(role.id, permission_id, true);
            store.insert(tables::ROLE_PERMISSIONS, to_row(&link)?).await?;
        }
        roles.insert(kind, role);
    }

    info!(permissions = inserted, roles = roles.len(), "Seeded system roles");
    Ok(roles)
}
