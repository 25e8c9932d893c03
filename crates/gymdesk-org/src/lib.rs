//! # Gymdesk Organization Management
//!
//! This crate manages the tree of gym organizations (franchises, branches,
//! studios) and the locations each one owns.
//!
//! ## Overview
//!
//! The gymdesk-org crate handles:
//! - **Organizations**: Tenants arranged in a forest through `parent_id`
//! - **Locations**: Physical sites owned by one organization
//! - **Hierarchy**: Ancestor chains, nested subtrees, safe re-parenting
//! - **Settings**: A closed set of per-organization feature flags
//! - **Context**: Request identity and organization context
//! - **API**: Transport-free request handlers with caller-facing error payloads
//!
//! ## Architecture
//!
//! ```text
//! Organization (root)
//!   ├─ Locations
//!   ├─ Settings
//!   └─ Organization (child)
//!         └─ Organization (grandchild)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gymdesk_org::{MoveOrganization, NewOrganization, OrgConfig, OrganizationService};
//! use gymdesk_store::MemoryStore;
//! use uuid::Uuid;
//!
//! async fn example() {
//!     let service = OrganizationService::new(Arc::new(MemoryStore::new()), OrgConfig::from_env());
//!     let acting_user = Uuid::now_v7();
//!
//!     let franchise = service
//!         .create_organization(NewOrganization::new("Iron Works"), acting_user)
//!         .await
//!         .unwrap();
//!     let branch = service
//!         .create_organization(NewOrganization::new("Downtown"), acting_user)
//!         .await
//!         .unwrap();
//!
//!     service
//!         .move_organization(branch.id, MoveOrganization::to(franchise.id), acting_user)
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Cross-Crate Integration
//!
//! - `gymdesk-store`: Data-store contract and in-memory backend
//! - `gymdesk-rbac`: Permission resolution used to gate every mutation

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod hierarchy;
pub mod location;
pub mod organization;
pub mod service;
pub mod settings;

/// Table names in the backing store.
pub mod tables {
    pub const ORGANIZATIONS: &str = "organizations";
    pub const LOCATIONS: &str = "locations";
}

// Re-export main types for convenience
pub use config::{ConfigError, OrgConfig};
pub use context::{AuthenticatedUser, RequestContext, RequestIdentity};
pub use error::{ErrorKind, ErrorPayload, HierarchyViolation, OrgError, OrgResult};
pub use hierarchy::{OrganizationHierarchy, OrganizationNode};
pub use location::{Location, NewLocation};
pub use organization::{
    GetOrganizationOptions, MoveOrganization, NewOrganization, Organization, OrganizationDetails,
    OrganizationSummary,
};
pub use service::OrganizationService;
pub use settings::{FeatureFlag, FeatureFlags, OrganizationSettings};
