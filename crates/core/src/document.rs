//! Hand-written workflow files.
//!
//! A document names node types by catalog id instead of embedding them, so
//! it stays short enough to write by hand:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "start", "type": "manual-trigger", "position": { "x": 0, "y": 0 } },
//!     { "id": "deploy", "type": "kubernetes", "config": { "action": "apply" } }
//!   ],
//!   "connections": [{ "source": "start", "target": "deploy" }]
//! }
//! ```

use crate::catalog::NodeCatalog;
use crate::error::{OpsflowError, Result};
use crate::store::WorkflowStore;
use crate::types::{CanvasState, NodeId, Point, WorkflowNode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default)]
    pub nodes: Vec<DocumentNode>,
    #[serde(default)]
    pub connections: Vec<DocumentConnection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Point,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentConnection {
    pub source: String,
    #[serde(default)]
    pub source_output: usize,
    pub target: String,
    #[serde(default)]
    pub target_input: usize,
}

impl WorkflowDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Export the store's nodes and connections, keeping node ids
    pub fn from_store(store: &WorkflowStore) -> Self {
        Self {
            nodes: store
                .nodes()
                .iter()
                .map(|node| DocumentNode {
                    id: node.id.to_string(),
                    node_type: node.node_type.id.clone(),
                    position: node.position,
                    config: node.config.clone(),
                })
                .collect(),
            connections: store
                .connections()
                .iter()
                .map(|c| DocumentConnection {
                    source: c.source_id.to_string(),
                    source_output: c.source_output,
                    target: c.target_id.to_string(),
                    target_input: c.target_input,
                })
                .collect(),
        }
    }

    /// Build a store from the document, resolving types against `catalog`
    ///
    /// Connections go through the store's own checks; rejected ones are
    /// skipped with a warning.
    pub fn into_store(self, catalog: &NodeCatalog) -> Result<WorkflowStore> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());

        for doc_node in self.nodes {
            if !seen.insert(doc_node.id.clone()) {
                return Err(OpsflowError::InvalidWorkflow(format!(
                    "duplicate node id: {}",
                    doc_node.id
                )));
            }

            let node_type = catalog
                .get(&doc_node.node_type)
                .ok_or_else(|| OpsflowError::UnknownNodeType(doc_node.node_type.clone()))?;

            let mut node = WorkflowNode::new(node_type, doc_node.position);
            node.id = NodeId::new(doc_node.id);
            node.config = doc_node.config;
            nodes.push(node);
        }

        let mut store = WorkflowStore::with_state(nodes, Vec::new(), CanvasState::default());

        for connection in self.connections {
            for endpoint in [&connection.source, &connection.target] {
                if !seen.contains(endpoint) {
                    return Err(OpsflowError::InvalidWorkflow(format!(
                        "connection references unknown node: {}",
                        endpoint
                    )));
                }
            }

            let added = store.add_connection(
                &NodeId::new(connection.source.as_str()),
                connection.source_output,
                &NodeId::new(connection.target.as_str()),
                connection.target_input,
            );
            if added.is_none() {
                tracing::warn!(
                    "Skipping connection {} -> {}: self-loop or duplicate pair",
                    connection.source,
                    connection.target
                );
            }
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nodes": [
            { "id": "start", "type": "manual-trigger", "position": { "x": 0, "y": 0 } },
            { "id": "deploy", "type": "kubernetes", "position": { "x": 250, "y": 0 },
              "config": { "action": "apply" } },
            { "id": "notify", "type": "slack" }
        ],
        "connections": [
            { "source": "start", "target": "deploy" },
            { "source": "deploy", "sourceOutput": 1, "target": "notify" },
            { "source": "notify", "target": "deploy" }
        ]
    }"#;

    #[test]
    fn test_import_sample() {
        let catalog = NodeCatalog::builtin().unwrap();
        let store = WorkflowDocument::from_json(SAMPLE)
            .unwrap()
            .into_store(&catalog)
            .unwrap();

        assert_eq!(store.nodes().len(), 3);
        // the reverse notify -> deploy edge duplicates an existing pair
        assert_eq!(store.connections().len(), 2);

        let deploy = store.node(&NodeId::new("deploy")).unwrap();
        assert_eq!(deploy.position, Point::new(250.0, 0.0));
        assert_eq!(deploy.config_value("action"), Some(&Value::from("apply")));
        assert_eq!(store.connections()[1].source_output, 1);
        assert_eq!(store.node(&NodeId::new("notify")).unwrap().position, Point::ORIGIN);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let catalog = NodeCatalog::builtin().unwrap();
        let doc = WorkflowDocument::from_json(
            r#"{ "nodes": [{ "id": "a", "type": "mainframe" }] }"#,
        )
        .unwrap();

        match doc.into_store(&catalog) {
            Err(OpsflowError::UnknownNodeType(id)) => assert_eq!(id, "mainframe"),
            other => panic!("expected unknown type error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_dangling_and_duplicate_ids_rejected() {
        let catalog = NodeCatalog::builtin().unwrap();

        let dangling = WorkflowDocument::from_json(
            r#"{ "nodes": [{ "id": "a", "type": "manual-trigger" }],
                 "connections": [{ "source": "a", "target": "ghost" }] }"#,
        )
        .unwrap();
        assert!(matches!(
            dangling.into_store(&catalog),
            Err(OpsflowError::InvalidWorkflow(_))
        ));

        let duplicate = WorkflowDocument::from_json(
            r#"{ "nodes": [{ "id": "a", "type": "manual-trigger" },
                           { "id": "a", "type": "slack" }] }"#,
        )
        .unwrap();
        assert!(matches!(
            duplicate.into_store(&catalog),
            Err(OpsflowError::InvalidWorkflow(_))
        ));
    }

    #[test]
    fn test_export_keeps_ids_and_types() {
        let catalog = NodeCatalog::builtin().unwrap();
        let store = WorkflowDocument::from_json(SAMPLE)
            .unwrap()
            .into_store(&catalog)
            .unwrap();

        let exported = WorkflowDocument::from_store(&store);
        assert_eq!(exported.nodes[1].id, "deploy");
        assert_eq!(exported.nodes[1].node_type, "kubernetes");
        assert_eq!(exported.connections.len(), 2);
        assert_eq!(exported.connections[0].source, "start");

        let json: Value = serde_json::from_str(&exported.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["connections"][1]["sourceOutput"], 1);
        assert!(json["nodes"][0].get("config").is_none());
    }
}
