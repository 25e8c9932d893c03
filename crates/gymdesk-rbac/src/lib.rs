//! # Gymdesk RBAC (Role-Based Access Control)
//!
//! This crate resolves what a user may do inside an organization.
//!
//! ## Overview
//!
//! The gymdesk-rbac crate handles:
//! - **Resources**: Closed set of back-office areas (clients, schedule, ...)
//! - **Actions**: Closed set of operations (read, create, write, delete, manage_roles)
//! - **Permissions**: Resource + Action combinations in a stored catalogue
//! - **Roles**: Named permission bundles, system-defined or custom
//! - **Memberships**: User + Organization + Role, with an active flag
//! - **Resolution**: Fail-closed permission checks over the store
//!
//! ## Architecture
//!
//! ```text
//! user_organizations (active) ─→ roles ─→ role_permissions ─→ permissions
//!                                              (granted)      (resource:action)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gymdesk_rbac::{seed_system_roles, Action, PermissionResolver, ResourceType};
//! use gymdesk_store::MemoryStore;
//! use uuid::Uuid;
//!
//! async fn example() {
//!     let store = Arc::new(MemoryStore::new());
//!     seed_system_roles(store.as_ref()).await.unwrap();
//!
//!     let resolver = PermissionResolver::new(store);
//!     let allowed = resolver
//!         .check_permission(Uuid::now_v7(), Uuid::now_v7(), ResourceType::Clients, Action::Read)
//!         .await;
//!     assert!(!allowed); // no membership, no access
//! }
//! ```

pub mod actions;
pub mod error;
pub mod manager;
pub mod membership;
pub mod permissions;
pub mod resolver;
pub mod resources;
pub mod roles;
pub mod seed;

/// Table names in the backing store.
pub mod tables {
    pub const PERMISSIONS: &str = "permissions";
    pub const ROLES: &str = "roles";
    pub const ROLE_PERMISSIONS: &str = "role_permissions";
    pub const MEMBERSHIPS: &str = "user_organizations";
}

// Re-export main types for convenience
pub use actions::Action;
pub use error::{RbacError, RbacResult};
pub use manager::RoleManager;
pub use membership::Membership;
pub use permissions::{
    group_by_resource, ActionGrant, Permission, PermissionFilter, PermissionGrant, PermissionKey,
    PermissionSet, RolePermission,
};
pub use resolver::PermissionResolver;
pub use resources::ResourceType;
pub use roles::{NewRole, Role, RoleSummary, SystemRole};
pub use seed::seed_system_roles;
