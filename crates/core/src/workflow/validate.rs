use super::graph::WorkflowGraph;
use crate::store::WorkflowStore;
use crate::types::NodeId;
use serde::Serialize;
use std::fmt;

/// Problem found in a workflow before running it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    NoTrigger,
    Unreachable { node_id: NodeId },
    MissingRequiredConfig { node_id: NodeId, fields: Vec<String> },
    /// Informational; a run still terminates
    Cycle,
}

impl ValidationIssue {
    /// Whether the issue prevents a useful run
    pub fn is_blocking(&self) -> bool {
        matches!(self, ValidationIssue::NoTrigger)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NoTrigger => write!(f, "workflow has no trigger node"),
            ValidationIssue::Unreachable { node_id } => {
                write!(f, "node {} is not reachable from any trigger", node_id)
            }
            ValidationIssue::MissingRequiredConfig { node_id, fields } => write!(
                f,
                "node {} is missing required config: {}",
                node_id,
                fields.join(", ")
            ),
            ValidationIssue::Cycle => write!(f, "workflow contains a cycle"),
        }
    }
}

/// Check the workflow in `store` for structural and configuration problems
pub fn validate(store: &WorkflowStore) -> Vec<ValidationIssue> {
    let graph = WorkflowGraph::from_parts(store.nodes(), store.connections());
    let mut issues = Vec::new();

    if graph.triggers().is_empty() {
        issues.push(ValidationIssue::NoTrigger);
    } else {
        let reached = graph.reachable_from_triggers();
        issues.extend(
            store
                .nodes()
                .iter()
                .filter(|n| !reached.contains(&n.id))
                .map(|n| ValidationIssue::Unreachable {
                    node_id: n.id.clone(),
                }),
        );
    }

    for node in store.nodes() {
        let missing = node.missing_required_fields();
        if !missing.is_empty() {
            issues.push(ValidationIssue::MissingRequiredConfig {
                node_id: node.id.clone(),
                fields: missing.into_iter().map(String::from).collect(),
            });
        }
    }

    if graph.has_cycle() {
        issues.push(ValidationIssue::Cycle);
    }

    issues
}
