use crate::types::{Connection, NodeId, WorkflowNode};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Directed graph view over a snapshot of the store
pub struct WorkflowGraph {
    // Edge weight is the connection's position in the store, so successors
    // can be listed in the order connections were drawn
    graph: DiGraph<NodeId, usize>,
    node_indices: HashMap<NodeId, NodeIndex>,
    triggers: Vec<NodeId>,
}

impl WorkflowGraph {
    /// Build the graph. Connections whose endpoints are missing are skipped.
    pub fn from_parts(nodes: &[WorkflowNode], connections: &[Connection]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in nodes {
            let index = graph.add_node(node.id.clone());
            node_indices.insert(node.id.clone(), index);
        }

        for (order, connection) in connections.iter().enumerate() {
            let source = node_indices.get(&connection.source_id);
            let target = node_indices.get(&connection.target_id);

            match (source, target) {
                (Some(&source), Some(&target)) => {
                    graph.add_edge(source, target, order);
                }
                _ => tracing::debug!("Skipping dangling connection {}", connection.id),
            }
        }

        let triggers = nodes
            .iter()
            .filter(|n| n.node_type.is_trigger())
            .map(|n| n.id.clone())
            .collect();

        Self {
            graph,
            node_indices,
            triggers,
        }
    }

    /// Nodes whose type has no inputs, in store order
    pub fn triggers(&self) -> &[NodeId] {
        &self.triggers
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Targets of a node's outgoing connections, in connection order
    pub fn successors(&self, node_id: &NodeId) -> Vec<NodeId> {
        let Some(&index) = self.node_indices.get(node_id) else {
            return Vec::new();
        };

        let mut edges: Vec<(usize, NodeIndex)> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (*edge.weight(), edge.target()))
            .collect();
        edges.sort_by_key(|(order, _)| *order);

        edges
            .into_iter()
            .map(|(_, target)| self.graph[target].clone())
            .collect()
    }

    /// Sources of a node's incoming connections
    pub fn predecessors(&self, node_id: &NodeId) -> Vec<NodeId> {
        let Some(&index) = self.node_indices.get(node_id) else {
            return Vec::new();
        };

        self.graph
            .neighbors_directed(index, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// Every node reachable from at least one trigger, triggers included
    pub fn reachable_from_triggers(&self) -> HashSet<NodeId> {
        let mut reached = HashSet::new();
        let Some(first) = self.triggers.first() else {
            return reached;
        };

        let mut dfs = Dfs::new(&self.graph, self.node_indices[first]);
        for trigger in &self.triggers {
            dfs.move_to(self.node_indices[trigger]);
            while let Some(index) = dfs.next(&self.graph) {
                reached.insert(self.graph[index].clone());
            }
        }

        reached
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }
}
