use crate::error::{OpsflowError, Result};
use crate::types::{NodeCategory, NodeType, WorkflowNode};
use std::collections::HashSet;
use std::sync::Arc;

/// Reference node-type table shipped with the crate
const BUILTIN_CATALOG: &str = include_str!("../data/node_types.json");

/// Read-only table of node types available to the editor
///
/// Entries are handed out as `Arc`s so every placed node shares its type
/// with the catalog instead of owning a copy.
#[derive(Debug, Clone, Default)]
pub struct NodeCatalog {
    types: Vec<Arc<NodeType>>,
}

impl NodeCatalog {
    /// Build a catalog from a list of node types, rejecting duplicate ids
    pub fn new(types: Vec<NodeType>) -> Result<Self> {
        let mut seen = HashSet::new();
        for node_type in &types {
            if !seen.insert(node_type.id.as_str()) {
                return Err(OpsflowError::Catalog(format!(
                    "duplicate node type id: {}",
                    node_type.id
                )));
            }
        }

        Ok(Self {
            types: types.into_iter().map(Arc::new).collect(),
        })
    }

    /// The reference catalog of cloud, CI/CD, container, monitoring, security,
    /// database, messaging and config node types
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let types: Vec<NodeType> = serde_json::from_str(json)?;
        Self::new(types)
    }

    pub fn get(&self, id: &str) -> Option<Arc<NodeType>> {
        self.types.iter().find(|t| t.id == id).cloned()
    }

    pub fn all(&self) -> &[Arc<NodeType>] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn by_category(&self, category: NodeCategory) -> Vec<Arc<NodeType>> {
        self.types
            .iter()
            .filter(|t| t.category == category)
            .cloned()
            .collect()
    }

    /// Categories that have at least one entry, in palette order
    pub fn categories(&self) -> Vec<NodeCategory> {
        NodeCategory::ALL
            .into_iter()
            .filter(|c| self.types.iter().any(|t| t.category == *c))
            .collect()
    }

    /// Case-insensitive substring match over name, description and category.
    /// An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<Arc<NodeType>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.types.clone();
        }

        self.types
            .iter()
            .filter(|t| {
                t.name.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
                    || t.category.as_str().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn triggers(&self) -> Vec<Arc<NodeType>> {
        self.types.iter().filter(|t| t.is_trigger()).cloned().collect()
    }

    /// Point nodes at this catalog's shared entries where the catalog holds
    /// an identical type. Nodes whose saved type differs keep their own copy.
    pub fn share_types(&self, nodes: &mut [WorkflowNode]) {
        for node in nodes {
            let shared = self
                .get(&node.node_type.id)
                .filter(|shared| **shared == *node.node_type);
            if let Some(shared) = shared {
                node.node_type = shared;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = NodeCatalog::builtin().unwrap();

        assert_eq!(catalog.len(), 25);
        assert_eq!(catalog.categories().len(), 8);
        assert_eq!(catalog.by_category(NodeCategory::Cloud).len(), 4);
        assert_eq!(catalog.by_category(NodeCategory::Config).len(), 5);

        let github = catalog.get("github-actions").unwrap();
        assert_eq!(github.inputs, 1);
        assert_eq!(github.outputs, 2);
    }

    #[test]
    fn test_builtin_triggers() {
        let catalog = NodeCatalog::builtin().unwrap();
        let ids: Vec<_> = catalog.triggers().iter().map(|t| t.id.clone()).collect();

        assert_eq!(ids, vec!["manual-trigger", "schedule-trigger", "webhook-trigger"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = NodeCatalog::builtin().unwrap();

        let hits = catalog.search("KUBER");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "kubernetes");

        // category names match too
        let security = catalog.search("security");
        assert!(security.iter().any(|t| t.id == "vault"));
        assert!(security.iter().any(|t| t.id == "snyk"));

        assert_eq!(catalog.search("").len(), catalog.len());
        assert!(catalog.search("no-such-thing").is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[
            {"id": "x", "name": "X", "category": "cloud", "icon": "Server",
             "description": "", "inputs": 1, "outputs": 1},
            {"id": "x", "name": "X2", "category": "cloud", "icon": "Server",
             "description": "", "inputs": 1, "outputs": 1}
        ]"#;

        let result = NodeCatalog::from_json(json);
        assert!(matches!(result, Err(OpsflowError::Catalog(_))));
    }

    #[test]
    fn test_share_types_relinks_known_entries() {
        let catalog = NodeCatalog::builtin().unwrap();
        let copy = Arc::new((*catalog.get("docker").unwrap()).clone());
        let mut nodes = vec![WorkflowNode::new(copy, Point::ORIGIN)];

        catalog.share_types(&mut nodes);

        assert!(Arc::ptr_eq(
            &nodes[0].node_type,
            &catalog.get("docker").unwrap()
        ));
    }

    #[test]
    fn test_share_types_keeps_changed_types() {
        let catalog = NodeCatalog::builtin().unwrap();
        let mut changed = (*catalog.get("docker").unwrap()).clone();
        changed.outputs += 1;
        let mut nodes = vec![WorkflowNode::new(Arc::new(changed), Point::ORIGIN)];

        catalog.share_types(&mut nodes);

        assert!(!Arc::ptr_eq(
            &nodes[0].node_type,
            &catalog.get("docker").unwrap()
        ));
        assert_eq!(
            nodes[0].node_type.outputs,
            catalog.get("docker").unwrap().outputs + 1
        );
    }
}
