use crate::types::{
    CanvasState, ConnectingFrom, Connection, ConnectionId, NodeId, NodeStatus, NodeType, Point,
    WorkflowNode, WorkflowSnapshot,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 2.0;
pub const ZOOM_STEP: f64 = 0.1;

/// Store shared between the interaction layer and a running simulation
pub type SharedStore = Arc<Mutex<WorkflowStore>>;

/// Canonical owner of nodes, connections and canvas state for one editor session
///
/// Every mutation either applies completely or is a silent no-op; invalid
/// input never surfaces as an error.
#[derive(Debug, Clone, Default)]
pub struct WorkflowStore {
    nodes: Vec<WorkflowNode>,
    connections: Vec<Connection>,
    canvas: CanvasState,
    // Bumped whenever statuses are reset so writes from an abandoned run are dropped
    run_epoch: u64,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an existing state
    pub fn with_state(
        nodes: Vec<WorkflowNode>,
        connections: Vec<Connection>,
        canvas: CanvasState,
    ) -> Self {
        Self {
            nodes,
            connections,
            canvas,
            run_epoch: 0,
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn canvas(&self) -> &CanvasState {
        &self.canvas
    }

    pub fn node(&self, node_id: &NodeId) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| &n.id == node_id)
    }

    pub fn selected_node(&self) -> Option<&WorkflowNode> {
        self.canvas
            .selected_node_id
            .as_ref()
            .and_then(|id| self.node(id))
    }

    pub fn run_epoch(&self) -> u64 {
        self.run_epoch
    }

    fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut WorkflowNode> {
        self.nodes.iter_mut().find(|n| &n.id == node_id)
    }

    /// Place a new idle node; insertion order is rendering order
    pub fn add_node(&mut self, node_type: Arc<NodeType>, position: Point) -> WorkflowNode {
        let node = WorkflowNode::new(node_type, position);
        tracing::debug!("Adding node {} ({})", node.id, node.node_type.id);
        self.nodes.push(node.clone());
        node
    }

    pub fn update_node_position(&mut self, node_id: &NodeId, position: Point) {
        if let Some(node) = self.node_mut(node_id) {
            node.position = position;
        }
    }

    /// Shallow-merge `partial` into the node's configuration
    pub fn update_node_config(&mut self, node_id: &NodeId, partial: Map<String, Value>) {
        match self.node_mut(node_id) {
            Some(node) => node.config.extend(partial),
            None => tracing::debug!("Ignoring config update for unknown node {}", node_id),
        }
    }

    /// Remove a node together with every connection touching it
    pub fn delete_node(&mut self, node_id: &NodeId) {
        let before = self.nodes.len();
        self.nodes.retain(|n| &n.id != node_id);
        if self.nodes.len() == before {
            return;
        }

        self.connections.retain(|c| !c.touches(node_id));

        if self.canvas.selected_node_id.as_ref() == Some(node_id) {
            self.canvas.selected_node_id = None;
        }

        tracing::debug!("Deleted node {}", node_id);
    }

    /// Connect two nodes. Self-loops and a second edge between the same pair
    /// of nodes (in either direction, on any ports) are rejected.
    pub fn add_connection(
        &mut self,
        source_id: &NodeId,
        source_output: usize,
        target_id: &NodeId,
        target_input: usize,
    ) -> Option<Connection> {
        if source_id == target_id {
            tracing::debug!("Rejecting self-connection on {}", source_id);
            return None;
        }

        if self
            .connections
            .iter()
            .any(|c| c.links(source_id, target_id))
        {
            tracing::debug!(
                "Rejecting duplicate connection between {} and {}",
                source_id,
                target_id
            );
            return None;
        }

        let connection = Connection {
            id: ConnectionId::generate(),
            source_id: source_id.clone(),
            source_output,
            target_id: target_id.clone(),
            target_input,
        };
        self.connections.push(connection.clone());
        Some(connection)
    }

    pub fn delete_connection(&mut self, connection_id: &ConnectionId) {
        self.connections.retain(|c| &c.id != connection_id);
    }

    /// Set or clear the selection. The id is not validated.
    pub fn select_node(&mut self, node_id: Option<NodeId>) {
        self.canvas.selected_node_id = node_id;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_finite() {
            tracing::debug!("Ignoring non-finite zoom {}", zoom);
            return;
        }
        self.canvas.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.canvas.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.canvas.zoom - ZOOM_STEP);
    }

    /// Back to 100% with the origin in the corner
    pub fn zoom_to_fit(&mut self) {
        self.canvas.zoom = 1.0;
        self.canvas.pan = Point::ORIGIN;
    }

    pub fn set_pan(&mut self, pan: Point) {
        self.canvas.pan = pan;
    }

    pub fn start_connecting(&mut self, node_id: NodeId, output: usize) {
        self.canvas.connecting_from = Some(ConnectingFrom { node_id, output });
    }

    /// Finish the in-progress connection. A connection is attempted only when
    /// both target arguments are present; the in-progress state is always cleared.
    pub fn end_connecting(
        &mut self,
        target_id: Option<&NodeId>,
        target_input: Option<usize>,
    ) -> Option<Connection> {
        let from = self.canvas.connecting_from.take()?;

        match (target_id, target_input) {
            (Some(target_id), Some(target_input)) => {
                self.add_connection(&from.node_id, from.output, target_id, target_input)
            }
            _ => None,
        }
    }

    /// Write a status on behalf of the run started at `epoch`.
    /// Returns false (and writes nothing) when that run has been abandoned.
    pub fn set_status(&mut self, node_id: &NodeId, status: NodeStatus, epoch: u64) -> bool {
        if epoch != self.run_epoch {
            return false;
        }

        if let Some(node) = self.node_mut(node_id) {
            node.status = status;
        }
        true
    }

    /// Set every node back to idle and invalidate any in-flight run
    pub fn reset_statuses(&mut self) {
        self.run_epoch += 1;
        for node in &mut self.nodes {
            node.status = NodeStatus::Idle;
        }
    }

    pub fn clear(&mut self) {
        self.run_epoch += 1;
        self.nodes.clear();
        self.connections.clear();
        self.canvas = CanvasState::default();
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Replace the workflow with a saved one. Statuses come back idle and the
    /// canvas returns to its defaults.
    pub fn restore(&mut self, snapshot: WorkflowSnapshot) {
        self.clear();
        self.nodes = snapshot.nodes;
        self.connections = snapshot.connections;
        for node in &mut self.nodes {
            node.status = NodeStatus::Idle;
        }
    }
}
