//! Tree assembly over flat organization rows
//!
//! Nothing here touches the store. The service collects rows by walking
//! `parent_id` links and hands them to these helpers. Every walk keeps a
//! visited set, so a corrupt stored cycle ends the walk instead of looping.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::organization::{Organization, OrganizationSummary};

/// One organization and its nested children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationNode {
    #[serde(flatten)]
    pub organization: OrganizationSummary,
    pub children: Vec<OrganizationNode>,
}

impl OrganizationNode {
    /// Number of levels in this subtree, counting the node itself.
    pub fn height(&self) -> usize {
        1 + subtree_height(&self.children)
    }
}

/// An organization with its ancestor chain and descendant subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationHierarchy {
    pub organization: Organization,

    /// Root first, direct parent last
    pub ancestors: Vec<OrganizationSummary>,

    /// Direct children, each with its own subtree
    pub descendants: Vec<OrganizationNode>,
}

impl OrganizationHierarchy {
    /// Level of the organization in its tree; a root is level 1.
    pub fn level(&self) -> usize {
        self.ancestors.len() + 1
    }

    pub fn root_id(&self) -> Uuid {
        self.ancestors
            .first()
            .map(|root| root.id)
            .unwrap_or(self.organization.id)
    }

    /// Ids of every descendant, parents before children.
    pub fn descendant_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::new();
        let mut stack: Vec<&OrganizationNode> = self.descendants.iter().rev().collect();
        while let Some(node) = stack.pop() {
            ids.push(node.organization.id);
            stack.extend(node.children.iter().rev());
        }
        ids
    }
}

/// Nest the flat `descendants` of `root_id` into a tree.
///
/// Siblings are ordered by name, then id. Rows unreachable from `root_id`
/// are ignored.
pub fn build_subtree(root_id: Uuid, descendants: &[OrganizationSummary]) -> Vec<OrganizationNode> {
    let mut by_parent: HashMap<Uuid, Vec<&OrganizationSummary>> = HashMap::new();
    for org in descendants {
        if let Some(parent_id) = org.parent_id {
            by_parent.entry(parent_id).or_default().push(org);
        }
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    }

    let mut visited = HashSet::from([root_id]);
    nest(root_id, &by_parent, &mut visited)
}

fn nest(
    parent_id: Uuid,
    by_parent: &HashMap<Uuid, Vec<&OrganizationSummary>>,
    visited: &mut HashSet<Uuid>,
) -> Vec<OrganizationNode> {
    let Some(children) = by_parent.get(&parent_id) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        if !visited.insert(child.id) {
            continue;
        }
        nodes.push(OrganizationNode {
            organization: (*child).clone(),
            children: nest(child.id, by_parent, visited),
        });
    }
    nodes
}

/// Number of levels below a node whose children are `nodes`.
pub fn subtree_height(nodes: &[OrganizationNode]) -> usize {
    nodes.iter().map(OrganizationNode::height).max().unwrap_or(0)
}
