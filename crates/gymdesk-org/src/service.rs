//! Organization hierarchy service
//!
//! Lookup, traversal, location attachment and re-parenting over the
//! `organizations` and `locations` tables. Every mutation validates fully
//! before it writes, so a rejected call leaves the store untouched. A move
//! that loses a race is undone by a second write before it reports Conflict.

use chrono::Utc;
use gymdesk_rbac::{Action, PermissionKey, PermissionResolver, ResourceType};
use gymdesk_store::{from_row, to_row, Direction, Query, Row, Store};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::OrgConfig;
use crate::error::{HierarchyViolation, OrgError, OrgResult};
use crate::hierarchy::{build_subtree, subtree_height, OrganizationHierarchy};
use crate::location::{Location, NewLocation};
use crate::organization::{
    GetOrganizationOptions, MoveOrganization, NewOrganization, Organization, OrganizationDetails,
    OrganizationSummary,
};
use crate::tables;

/// Organization hierarchy operations.
///
/// Share one instance per process (behind an `Arc`) so the advisory move
/// lock covers every mover.
pub struct OrganizationService {
    store: Arc<dyn Store>,
    resolver: PermissionResolver,
    config: OrgConfig,
    move_lock: Mutex<()>,
}

impl std::fmt::Debug for OrganizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrganizationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OrganizationService {
    pub fn new(store: Arc<dyn Store>, config: OrgConfig) -> Self {
        Self {
            resolver: PermissionResolver::new(store.clone()),
            store,
            config,
            move_lock: Mutex::new(()),
        }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub fn config(&self) -> &OrgConfig {
        &self.config
    }

    /// Fail with Forbidden unless the user holds `resource:action` in the
    /// organization. A no-op when permission enforcement is off.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        resource: ResourceType,
        action: Action,
    ) -> OrgResult<()> {
        if !self.config.enforce_permissions {
            return Ok(());
        }
        let key = PermissionKey::new(resource, action);
        self.resolver
            .require_permission(user_id, organization_id, key)
            .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> OrgResult<Option<Organization>> {
        self.store
            .select_one(tables::ORGANIZATIONS, &Query::new().eq("id", id))
            .await?
            .map(|row| decode(tables::ORGANIZATIONS, row))
            .transpose()
    }

    async fn fetch(&self, id: Uuid) -> OrgResult<Organization> {
        self.find(id)
            .await?
            .ok_or_else(|| OrgError::not_found("organization", id))
    }

    /// Fetch one organization, optionally joined with its locations.
    #[instrument(skip(self))]
    pub async fn get_organization_by_id(
        &self,
        id: Uuid,
        options: GetOrganizationOptions,
    ) -> OrgResult<OrganizationDetails> {
        let organization = self.fetch(id).await?;
        let locations = if options.include_locations {
            Some(self.list_locations(id).await?)
        } else {
            None
        };
        Ok(OrganizationDetails {
            organization,
            locations,
        })
    }

    /// Direct children of an organization, ordered by name.
    #[instrument(skip(self))]
    pub async fn list_children(&self, id: Uuid) -> OrgResult<Vec<Organization>> {
        self.fetch(id).await?;
        let query = Query::new()
            .eq("parent_id", id)
            .order_by("name", Direction::Ascending);
        let rows = self.store.select(tables::ORGANIZATIONS, &query).await?;
        rows.into_iter()
            .map(|row| decode(tables::ORGANIZATIONS, row))
            .collect()
    }

    /// Locations of an organization, ordered by name.
    pub async fn list_locations(&self, organization_id: Uuid) -> OrgResult<Vec<Location>> {
        let query = Query::new()
            .eq("organization_id", organization_id)
            .order_by("name", Direction::Ascending);
        let rows = self.store.select(tables::LOCATIONS, &query).await?;
        rows.into_iter()
            .map(|row| decode(tables::LOCATIONS, row))
            .collect()
    }

    /// Chain of ancestors of `org`, root first.
    async fn ancestors(&self, org: &Organization) -> OrgResult<Vec<OrganizationSummary>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([org.id]);
        let mut next = org.parent_id;

        while let Some(parent_id) = next {
            if !visited.insert(parent_id) {
                error!(organization_id = %org.id, %parent_id, "Stored hierarchy contains a cycle");
                break;
            }
            let Some(parent) = self.find(parent_id).await? else {
                warn!(organization_id = %org.id, %parent_id, "Dangling parent reference");
                break;
            };
            next = parent.parent_id;
            chain.push(parent.summary());
        }

        chain.reverse();
        Ok(chain)
    }

    /// Every organization below `id`, gathered breadth-first.
    async fn descendants(&self, id: Uuid) -> OrgResult<Vec<OrganizationSummary>> {
        let mut found = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut frontier = vec![id];

        while !frontier.is_empty() {
            let query = Query::new().in_list("parent_id", frontier.iter().copied());
            let rows = self.store.select(tables::ORGANIZATIONS, &query).await?;

            let mut next = Vec::new();
            for row in rows {
                let child: Organization = decode(tables::ORGANIZATIONS, row)?;
                if !visited.insert(child.id) {
                    error!(organization_id = %child.id, "Stored hierarchy contains a cycle");
                    continue;
                }
                next.push(child.id);
                found.push(child.summary());
            }
            frontier = next;
        }

        Ok(found)
    }

    /// The organization with its ancestors (root first) and nested
    /// descendants.
    #[instrument(skip(self))]
    pub async fn get_organization_hierarchy(&self, id: Uuid) -> OrgResult<OrganizationHierarchy> {
        let organization = self.fetch(id).await?;
        let ancestors = self.ancestors(&organization).await?;
        let flat = self.descendants(id).await?;
        let descendants = build_subtree(id, &flat);

        debug!(
            ancestors = ancestors.len(),
            descendants = flat.len(),
            "Loaded hierarchy"
        );
        Ok(OrganizationHierarchy {
            organization,
            ancestors,
            descendants,
        })
    }

    /// Create an organization, optionally below an existing parent.
    ///
    /// Creating below a parent requires `organization:write` in the parent.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_organization(
        &self,
        input: NewOrganization,
        acting_user_id: Uuid,
    ) -> OrgResult<Organization> {
        input.validate()?;

        let mut organization =
            Organization::new(input.name.trim()).with_settings(input.settings);

        if let Some(parent_id) = input.parent_id {
            let parent = self.fetch(parent_id).await?;
            self.authorize(acting_user_id, parent.id, ResourceType::Organization, Action::Write)
                .await?;

            let level = self.ancestors(&parent).await?.len() + 2;
            if level > self.config.max_hierarchy_depth {
                return Err(self.depth_exceeded());
            }
            organization = organization.with_parent(parent.id);
        }

        self.store
            .insert(tables::ORGANIZATIONS, to_row(&organization)?)
            .await?;

        info!(organization_id = %organization.id, parent_id = ?organization.parent_id, "Created organization");
        Ok(organization)
    }

    /// Attach a new location to an existing organization.
    #[instrument(skip(self, input), fields(organization_id = %input.organization_id))]
    pub async fn create_location(
        &self,
        input: NewLocation,
        acting_user_id: Uuid,
    ) -> OrgResult<Location> {
        input.validate()?;

        let organization = self.fetch(input.organization_id).await?;
        self.authorize(
            acting_user_id,
            organization.id,
            ResourceType::Locations,
            Action::Create,
        )
        .await?;

        let location = Location::from_input(input, acting_user_id);
        self.store
            .insert(tables::LOCATIONS, to_row(&location)?)
            .await?;

        info!(location_id = %location.id, "Created location");
        Ok(location)
    }

    /// Re-parent an organization, or detach it into a root.
    ///
    /// Checks run in order: the organization exists, it is not its own
    /// parent, the new parent exists, the acting user holds
    /// `organization:write` in both, the new parent is outside the moved
    /// subtree, and the depth limit holds. Asking for the current parent
    /// returns the organization untouched once permissions pass.
    ///
    /// The write is a compare-and-set on the row version. Afterwards the
    /// new ancestor chain is walked again; if a mover elsewhere closed a
    /// loop through this organization in the meantime, the previous parent
    /// is restored and the call fails with Conflict.
    #[instrument(skip(self))]
    pub async fn move_organization(
        &self,
        id: Uuid,
        request: MoveOrganization,
        acting_user_id: Uuid,
    ) -> OrgResult<Organization> {
        let _guard = if self.config.serialize_moves {
            Some(self.move_lock.lock().await)
        } else {
            None
        };

        let organization = self.fetch(id).await?;
        if request.new_parent_id == Some(id) {
            return Err(OrgError::InvalidOperation(HierarchyViolation::SelfParent));
        }

        let new_parent = match request.new_parent_id {
            Some(parent_id) => Some(self.fetch(parent_id).await?),
            None => None,
        };

        self.authorize(acting_user_id, id, ResourceType::Organization, Action::Write)
            .await?;
        if let Some(parent) = &new_parent {
            self.authorize(acting_user_id, parent.id, ResourceType::Organization, Action::Write)
                .await?;
        }

        if organization.parent_id == request.new_parent_id {
            debug!("Parent unchanged, nothing to write");
            return Ok(organization);
        }

        let subtree = self.descendants(id).await?;
        if let Some(parent) = &new_parent {
            if subtree.iter().any(|org| org.id == parent.id) {
                return Err(OrgError::InvalidOperation(
                    HierarchyViolation::CircularReference,
                ));
            }
        }

        let level = match &new_parent {
            Some(parent) => self.ancestors(parent).await?.len() + 2,
            None => 1,
        };
        let deepest = level + subtree_height(&build_subtree(id, &subtree));
        if deepest > self.config.max_hierarchy_depth {
            return Err(self.depth_exceeded());
        }

        let expected = Query::new()
            .eq("id", id)
            .eq("version", organization.version);
        let patch = row([
            ("parent_id", json!(request.new_parent_id)),
            ("version", json!(organization.version + 1)),
            ("updated_at", json!(Utc::now())),
        ]);
        let updated = self
            .store
            .update(tables::ORGANIZATIONS, &expected, patch)
            .await?;

        let Some(written) = updated.into_iter().next() else {
            warn!(organization_id = %id, "Organization changed during move");
            return Err(OrgError::Conflict(format!(
                "organization {} was modified concurrently",
                id
            )));
        };
        let moved: Organization = decode(tables::ORGANIZATIONS, written)?;

        match self.closes_cycle(id, moved.parent_id).await {
            Ok(false) => {}
            Ok(true) => {
                warn!(organization_id = %id, "Concurrent move closed a loop, undoing");
                self.restore_parent(&organization, &moved).await;
                return Err(OrgError::Conflict(format!(
                    "organization {} was re-parented concurrently",
                    id
                )));
            }
            Err(e) => {
                self.restore_parent(&organization, &moved).await;
                return Err(e);
            }
        }

        info!(
            organization_id = %id,
            from = ?organization.parent_id,
            to = ?moved.parent_id,
            "Moved organization"
        );
        Ok(moved)
    }

    /// Whether walking up from `parent_id` leads back to `id`.
    async fn closes_cycle(&self, id: Uuid, parent_id: Option<Uuid>) -> OrgResult<bool> {
        let mut visited = HashSet::new();
        let mut next = parent_id;

        while let Some(current) = next {
            if current == id {
                return Ok(true);
            }
            if !visited.insert(current) {
                break;
            }
            next = self.find(current).await?.and_then(|org| org.parent_id);
        }
        Ok(false)
    }

    /// Put `before.parent_id` back, provided nobody wrote the row after us.
    async fn restore_parent(&self, before: &Organization, written: &Organization) {
        let expected = Query::new()
            .eq("id", written.id)
            .eq("version", written.version);
        let patch = row([
            ("parent_id", json!(before.parent_id)),
            ("version", json!(written.version + 1)),
            ("updated_at", json!(Utc::now())),
        ]);

        match self.store.update(tables::ORGANIZATIONS, &expected, patch).await {
            Ok(rows) if !rows.is_empty() => {
                debug!(organization_id = %written.id, "Restored previous parent");
            }
            Ok(_) => {
                error!(organization_id = %written.id, "Organization rewritten before its move could be undone");
            }
            Err(e) => {
                error!(organization_id = %written.id, error = %e, "Failed to undo move");
            }
        }
    }

    fn depth_exceeded(&self) -> OrgError {
        OrgError::InvalidOperation(HierarchyViolation::DepthExceeded {
            max_depth: self.config.max_hierarchy_depth,
        })
    }
}

fn decode<T: DeserializeOwned>(table: &'static str, row: Row) -> OrgResult<T> {
    from_row(row).map_err(|e| {
        error!(table, error = %e, "Undecodable row");
        OrgError::Internal(format!("invalid row in {}: {}", table, e))
    })
}

fn row<const N: usize>(fields: [(&str, serde_json::Value); N]) -> Row {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymdesk_store::MemoryStore;

    fn service(store: &Arc<MemoryStore>) -> OrganizationService {
        OrganizationService::new(store.clone(), OrgConfig::without_permissions())
    }

    async fn org(service: &OrganizationService, name: &str, parent: Option<Uuid>) -> Organization {
        let mut input = NewOrganization::new(name);
        input.parent_id = parent;
        service.create_organization(input, Uuid::now_v7()).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_by_id_with_locations() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let gym = org(&service, "Iron Works", None).await;
        let user = Uuid::now_v7();

        service
            .create_location(NewLocation::new(gym.id, "Riverside"), user)
            .await
            .unwrap();
        service
            .create_location(NewLocation::new(gym.id, "Downtown"), user)
            .await
            .unwrap();

        let plain = service
            .get_organization_by_id(gym.id, GetOrganizationOptions::default())
            .await
            .unwrap();
        assert_eq!(plain.organization, gym);
        assert!(plain.locations.is_none());

        let joined = service
            .get_organization_by_id(gym.id, GetOrganizationOptions::with_locations())
            .await
            .unwrap();
        let names: Vec<_> = joined
            .locations
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Downtown", "Riverside"]);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let err = service(&store)
            .get_organization_by_id(Uuid::now_v7(), GetOrganizationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrgError::NotFound { entity: "organization", .. }));
    }

    #[tokio::test]
    async fn test_hierarchy_shape() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let root = org(&service, "Iron Works", None).await;
        let north = org(&service, "North", Some(root.id)).await;
        let south = org(&service, "South", Some(root.id)).await;
        let harbor = org(&service, "Harbor", Some(north.id)).await;

        let hierarchy = service.get_organization_hierarchy(north.id).await.unwrap();
        assert_eq!(hierarchy.ancestors, vec![root.summary()]);
        assert_eq!(hierarchy.descendant_ids(), vec![harbor.id]);

        let hierarchy = service.get_organization_hierarchy(root.id).await.unwrap();
        assert!(hierarchy.ancestors.is_empty());
        assert_eq!(hierarchy.descendant_ids(), vec![north.id, harbor.id, south.id]);

        let children = service.list_children(root.id).await.unwrap();
        assert_eq!(children, vec![north, south]);
    }

    #[tokio::test]
    async fn test_move_bumps_version() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let a = org(&service, "A", None).await;
        let b = org(&service, "B", None).await;

        let moved = service
            .move_organization(a.id, MoveOrganization::to(b.id), Uuid::now_v7())
            .await
            .unwrap();
        assert_eq!(moved.parent_id, Some(b.id));
        assert_eq!(moved.version, a.version + 1);
        assert!(moved.updated_at >= a.updated_at);
    }

    #[tokio::test]
    async fn test_move_without_change_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let root = org(&service, "Root", None).await;
        let child = org(&service, "Child", Some(root.id)).await;

        let same = service
            .move_organization(child.id, MoveOrganization::to(root.id), Uuid::now_v7())
            .await
            .unwrap();
        assert_eq!(same, child);
    }

    /// Bumps the target row's version right before every update, as a
    /// concurrent writer would.
    struct RacingStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl Store for RacingStore {
        async fn select(&self, table: &str, query: &Query) -> gymdesk_store::StoreResult<Vec<Row>> {
            self.inner.select(table, query).await
        }

        async fn insert(&self, table: &str, new_row: Row) -> gymdesk_store::StoreResult<Row> {
            self.inner.insert(table, new_row).await
        }

        async fn update(
            &self,
            table: &str,
            query: &Query,
            patch: Row,
        ) -> gymdesk_store::StoreResult<Vec<Row>> {
            for current in self.inner.select(table, &Query::new()).await? {
                let version = current.get("version").and_then(|v| v.as_i64()).unwrap_or(0);
                let by_id = Query::new().eq("id", current.get("id").cloned());
                self.inner
                    .update(table, &by_id, row([("version", json!(version + 1))]))
                    .await?;
            }
            self.inner.update(table, query, patch).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_change_is_conflict() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
        });
        let service = OrganizationService::new(store.clone(), OrgConfig::without_permissions());
        let a = org(&service, "A", None).await;
        let b = org(&service, "B", None).await;

        let err = service
            .move_organization(a.id, MoveOrganization::to(b.id), Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, OrgError::Conflict(_)));
        assert_eq!(err.status_code(), 409);

        let stored = service
            .get_organization_by_id(a.id, GetOrganizationOptions::default())
            .await
            .unwrap();
        assert_eq!(stored.organization.parent_id, None);
    }

    #[tokio::test]
    async fn test_create_organization_depth_limit() {
        let store = Arc::new(MemoryStore::new());
        let config = OrgConfig {
            max_hierarchy_depth: 2,
            ..OrgConfig::without_permissions()
        };
        let service = OrganizationService::new(store.clone(), config);
        let root = org(&service, "Root", None).await;
        let child = org(&service, "Child", Some(root.id)).await;

        let err = service
            .create_organization(NewOrganization::new("Grandchild").under(child.id), Uuid::now_v7())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DEPTH_EXCEEDED");
        assert_eq!(store.count(tables::ORGANIZATIONS).await, 2);
    }
}
