use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Add, Sub};
use std::sync::Arc;
use uuid::Uuid;

/// Build an identifier of the form `<prefix>-<unix millis>-<9 random chars>`
fn generate_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), &suffix[..9])
}

/// Unique identifier for a simulated workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a node placed on the canvas
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(generate_id("node"))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a connection between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(generate_id("conn"))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point or offset in either screen or canvas space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Divide both coordinates by a scale factor
    pub fn scale_down(self, factor: f64) -> Self {
        Self::new(self.x / factor, self.y / factor)
    }

    pub fn distance_to(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Category a node type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Cloud,
    Cicd,
    Container,
    Monitoring,
    Security,
    Database,
    Messaging,
    Config,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 8] = [
        NodeCategory::Cloud,
        NodeCategory::Cicd,
        NodeCategory::Container,
        NodeCategory::Monitoring,
        NodeCategory::Security,
        NodeCategory::Database,
        NodeCategory::Messaging,
        NodeCategory::Config,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCategory::Cloud => "cloud",
            NodeCategory::Cicd => "cicd",
            NodeCategory::Container => "container",
            NodeCategory::Monitoring => "monitoring",
            NodeCategory::Security => "security",
            NodeCategory::Database => "database",
            NodeCategory::Messaging => "messaging",
            NodeCategory::Config => "config",
        }
    }

    /// Human readable name shown in palettes
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeCategory::Cloud => "Cloud",
            NodeCategory::Cicd => "CI/CD",
            NodeCategory::Container => "Containers",
            NodeCategory::Monitoring => "Monitoring",
            NodeCategory::Security => "Security",
            NodeCategory::Database => "Database",
            NodeCategory::Messaging => "Messaging",
            NodeCategory::Config => "Config & IaC",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NodeCategory::Cloud => "Cloud",
            NodeCategory::Cicd => "GitBranch",
            NodeCategory::Container => "Box",
            NodeCategory::Monitoring => "Activity",
            NodeCategory::Security => "Shield",
            NodeCategory::Database => "Database",
            NodeCategory::Messaging => "MessageSquare",
            NodeCategory::Config => "Settings",
        }
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input widget used to edit a configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Select,
    Number,
    Boolean,
    Textarea,
    Secret,
}

/// Choice offered by a select field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

/// Descriptor of one configurable parameter of a node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

/// Immutable catalog entry describing an operation that can be placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    pub id: String,
    pub name: String,
    pub category: NodeCategory,
    pub icon: String,
    pub description: String,
    pub inputs: usize,
    pub outputs: usize,
    #[serde(default)]
    pub config: Vec<ConfigField>,
}

impl NodeType {
    /// Trigger types have no inputs and start a traversal
    pub fn is_trigger(&self) -> bool {
        self.inputs == 0
    }

    pub fn field(&self, field_id: &str) -> Option<&ConfigField> {
        self.config.iter().find(|f| f.id == field_id)
    }
}

/// Execution status of a placed node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

impl NodeStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, NodeStatus::Success | NodeStatus::Error)
    }
}

/// A node type instance placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: Arc<NodeType>,
    pub position: Point,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub status: NodeStatus,
}

impl WorkflowNode {
    pub fn new(node_type: Arc<NodeType>, position: Point) -> Self {
        Self {
            id: NodeId::generate(),
            node_type,
            position,
            config: Map::new(),
            status: NodeStatus::Idle,
        }
    }

    /// Configured value for a field, falling back to the field's default
    pub fn config_value(&self, field_id: &str) -> Option<&Value> {
        self.config.get(field_id).or_else(|| {
            self.node_type
                .field(field_id)
                .and_then(|field| field.default_value.as_ref())
        })
    }

    /// Ids of required fields that have no usable value
    pub fn missing_required_fields(&self) -> Vec<&str> {
        self.node_type
            .config
            .iter()
            .filter(|field| field.required)
            .filter(|field| match self.config_value(&field.id) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .map(|field| field.id.as_str())
            .collect()
    }
}

/// Directed edge from a node's output port to another node's input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub source_id: NodeId,
    pub source_output: usize,
    pub target_id: NodeId,
    pub target_input: usize,
}

impl Connection {
    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source_id == node_id || &self.target_id == node_id
    }

    /// Whether this connection joins `a` and `b` in either direction
    pub fn links(&self, a: &NodeId, b: &NodeId) -> bool {
        (&self.source_id == a && &self.target_id == b)
            || (&self.source_id == b && &self.target_id == a)
    }
}

/// Source of a connection gesture whose target is not yet known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectingFrom {
    pub node_id: NodeId,
    pub output: usize,
}

/// Per-session view state of the editor canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    pub zoom: f64,
    pub pan: Point,
    pub selected_node_id: Option<NodeId>,
    pub connecting_from: Option<ConnectingFrom>,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ORIGIN,
            selected_node_id: None,
            connecting_from: None,
        }
    }
}

/// Persisted form of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub nodes: Vec<WorkflowNode>,
    pub connections: Vec<Connection>,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn terraform() -> Arc<NodeType> {
        Arc::new(NodeType {
            id: "terraform".to_string(),
            name: "Terraform".to_string(),
            category: NodeCategory::Config,
            icon: "Layers".to_string(),
            description: "Plan and apply infrastructure changes".to_string(),
            inputs: 1,
            outputs: 2,
            config: vec![
                ConfigField {
                    id: "action".to_string(),
                    label: "Action".to_string(),
                    kind: FieldKind::Select,
                    placeholder: None,
                    options: vec![FieldOption {
                        label: "Plan".to_string(),
                        value: "plan".to_string(),
                    }],
                    required: true,
                    default_value: None,
                },
                ConfigField {
                    id: "workspace".to_string(),
                    label: "Workspace".to_string(),
                    kind: FieldKind::Text,
                    placeholder: None,
                    options: vec![],
                    required: false,
                    default_value: Some(json!("default")),
                },
            ],
        })
    }

    #[test]
    fn test_generated_ids_are_unique_and_prefixed() {
        let a = NodeId::generate();
        let b = NodeId::generate();
        assert_ne!(a, b);
        assert!(a.0.starts_with("node-"));
        assert!(ConnectionId::generate().0.starts_with("conn-"));
    }

    #[test]
    fn test_config_value_falls_back_to_default() {
        let mut node = WorkflowNode::new(terraform(), Point::ORIGIN);
        assert_eq!(node.config_value("workspace"), Some(&json!("default")));
        assert_eq!(node.config_value("action"), None);

        node.config.insert("workspace".to_string(), json!("prod"));
        assert_eq!(node.config_value("workspace"), Some(&json!("prod")));
    }

    #[test]
    fn test_missing_required_fields() {
        let mut node = WorkflowNode::new(terraform(), Point::ORIGIN);
        assert_eq!(node.missing_required_fields(), vec!["action"]);

        node.config.insert("action".to_string(), json!("  "));
        assert_eq!(node.missing_required_fields(), vec!["action"]);

        node.config.insert("action".to_string(), json!("plan"));
        assert!(node.missing_required_fields().is_empty());
    }

    #[test]
    fn test_node_type_json_shape() {
        let json = r#"{
            "id": "manual-trigger",
            "name": "Manual Trigger",
            "category": "config",
            "icon": "Play",
            "description": "Start workflow manually",
            "inputs": 0,
            "outputs": 1
        }"#;

        let node_type: NodeType = serde_json::from_str(json).unwrap();
        assert!(node_type.is_trigger());
        assert!(node_type.config.is_empty());
        assert_eq!(node_type.category, NodeCategory::Config);
    }

    #[test]
    fn test_connection_links_either_direction() {
        let conn = Connection {
            id: ConnectionId::new("c1"),
            source_id: NodeId::new("a"),
            source_output: 0,
            target_id: NodeId::new("b"),
            target_input: 0,
        };

        assert!(conn.links(&NodeId::new("a"), &NodeId::new("b")));
        assert!(conn.links(&NodeId::new("b"), &NodeId::new("a")));
        assert!(!conn.links(&NodeId::new("a"), &NodeId::new("c")));
        assert!(conn.touches(&NodeId::new("b")));
    }
}
