//! Coordinate transforms and layout math for the editor canvas.
//!
//! Canvas space is the logical plane nodes live on. Screen space is what the
//! pointer reports. The two are related by the canvas origin on screen, the
//! pan offset and the zoom factor.

use crate::types::{CanvasState, Connection, NodeId, Point, WorkflowNode};

/// Fixed node footprint used for anchors, centering and hit-testing
pub const NODE_WIDTH: f64 = 200.0;
pub const NODE_HEIGHT: f64 = 80.0;
/// Distance of a port handle from the node edge
pub const HANDLE_OFFSET: f64 = 12.0;
/// Vertical distance between adjacent ports
pub const PORT_SPACING: f64 = 20.0;
pub const HANDLE_RADIUS: f64 = 8.0;
const MAX_CONTROL_OFFSET: f64 = 150.0;

/// Pan/zoom state needed to map between screen and canvas space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Screen position of the canvas element's top-left corner
    pub origin: Point,
    pub pan: Point,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(origin: Point, pan: Point, zoom: f64) -> Self {
        Self { origin, pan, zoom }
    }

    pub fn from_canvas(origin: Point, canvas: &CanvasState) -> Self {
        Self::new(origin, canvas.pan, canvas.zoom)
    }

    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        (screen - self.origin - self.pan).scale_down(self.zoom)
    }

    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        Point::new(
            canvas.x * self.zoom + self.origin.x + self.pan.x,
            canvas.y * self.zoom + self.origin.y + self.pan.y,
        )
    }

    /// Node position that centers a freshly dropped node under the pointer
    pub fn drop_position(&self, screen: Point) -> Point {
        self.screen_to_canvas(screen) - Point::new(NODE_WIDTH / 2.0, NODE_HEIGHT / 2.0)
    }

    /// Canvas position shown at the middle of a viewport of the given size,
    /// adjusted so a node placed there is centered
    pub fn center_position(&self, size: Point) -> Point {
        let center = self.origin + Point::new(size.x / 2.0, size.y / 2.0);
        self.drop_position(center)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSide {
    Input,
    Output,
}

/// Anchor of port `index` out of `total` on a node placed at `position`
pub fn port_anchor(position: Point, side: PortSide, index: usize, total: usize) -> Point {
    let x = match side {
        PortSide::Output => position.x + NODE_WIDTH + HANDLE_OFFSET,
        PortSide::Input => position.x - HANDLE_OFFSET,
    };
    let mid_y = position.y + NODE_HEIGHT / 2.0;

    if total > 1 {
        let span = (total - 1) as f64 * PORT_SPACING;
        Point::new(x, mid_y - span / 2.0 + index as f64 * PORT_SPACING)
    } else {
        Point::new(x, mid_y)
    }
}

pub fn output_anchor(node: &WorkflowNode, index: usize) -> Point {
    port_anchor(node.position, PortSide::Output, index, node.node_type.outputs)
}

pub fn input_anchor(node: &WorkflowNode, index: usize) -> Point {
    port_anchor(node.position, PortSide::Input, index, node.node_type.inputs)
}

/// Cubic bezier used to draw a connection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicCurve {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicCurve {
    /// Horizontal S-curve between two anchors
    pub fn between(start: Point, end: Point) -> Self {
        let offset = ((end.x - start.x).abs() / 2.0).min(MAX_CONTROL_OFFSET);
        Self {
            start,
            control1: Point::new(start.x + offset, start.y),
            control2: Point::new(end.x - offset, end.y),
            end,
        }
    }

    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

/// Curve for a stored connection, if both endpoints still exist
pub fn connection_curve(nodes: &[WorkflowNode], connection: &Connection) -> Option<CubicCurve> {
    let source = nodes.iter().find(|n| n.id == connection.source_id)?;
    let target = nodes.iter().find(|n| n.id == connection.target_id)?;

    Some(CubicCurve::between(
        output_anchor(source, connection.source_output),
        input_anchor(target, connection.target_input),
    ))
}

/// What lies under a point in canvas space
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Background,
    Node(NodeId),
    OutputHandle { node_id: NodeId, index: usize },
    InputHandle { node_id: NodeId, index: usize },
}

/// Find the topmost element under `point`. Later nodes are drawn on top, so
/// they win; within a node, handles win over the body.
pub fn hit_test(nodes: &[WorkflowNode], point: Point) -> HitTarget {
    for node in nodes.iter().rev() {
        for index in 0..node.node_type.outputs {
            if output_anchor(node, index).distance_to(point) <= HANDLE_RADIUS {
                return HitTarget::OutputHandle {
                    node_id: node.id.clone(),
                    index,
                };
            }
        }

        for index in 0..node.node_type.inputs {
            if input_anchor(node, index).distance_to(point) <= HANDLE_RADIUS {
                return HitTarget::InputHandle {
                    node_id: node.id.clone(),
                    index,
                };
            }
        }

        let inside_x = point.x >= node.position.x && point.x <= node.position.x + NODE_WIDTH;
        let inside_y = point.y >= node.position.y && point.y <= node.position.y + NODE_HEIGHT;
        if inside_x && inside_y {
            return HitTarget::Node(node.id.clone());
        }
    }

    HitTarget::Background
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeCategory, NodeType};
    use std::sync::Arc;

    fn node_at(x: f64, y: f64, inputs: usize, outputs: usize) -> WorkflowNode {
        let node_type = Arc::new(NodeType {
            id: "kubernetes".to_string(),
            name: "Kubernetes".to_string(),
            category: NodeCategory::Container,
            icon: "Box".to_string(),
            description: String::new(),
            inputs,
            outputs,
            config: vec![],
        });
        WorkflowNode::new(node_type, Point::new(x, y))
    }

    #[test]
    fn test_screen_to_canvas() {
        let viewport = Viewport::new(Point::new(64.0, 48.0), Point::new(100.0, -20.0), 2.0);

        let canvas = viewport.screen_to_canvas(Point::new(364.0, 228.0));
        assert_eq!(canvas, Point::new(100.0, 100.0));
        assert_eq!(viewport.canvas_to_screen(canvas), Point::new(364.0, 228.0));
    }

    #[test]
    fn test_drop_position_centers_node() {
        let viewport = Viewport::new(Point::ORIGIN, Point::ORIGIN, 1.0);

        assert_eq!(
            viewport.drop_position(Point::new(300.0, 200.0)),
            Point::new(200.0, 160.0)
        );
    }

    #[test]
    fn test_center_position() {
        let viewport = Viewport::new(Point::ORIGIN, Point::new(50.0, 50.0), 1.0);

        assert_eq!(
            viewport.center_position(Point::new(1000.0, 600.0)),
            Point::new(350.0, 210.0)
        );
    }

    #[test]
    fn test_single_port_anchor_is_centered() {
        let anchor = port_anchor(Point::new(10.0, 20.0), PortSide::Output, 0, 1);
        assert_eq!(anchor, Point::new(222.0, 60.0));

        let anchor = port_anchor(Point::new(10.0, 20.0), PortSide::Input, 0, 1);
        assert_eq!(anchor, Point::new(-2.0, 60.0));
    }

    #[test]
    fn test_multiple_ports_are_spread_around_center() {
        let top = port_anchor(Point::ORIGIN, PortSide::Output, 0, 2);
        let bottom = port_anchor(Point::ORIGIN, PortSide::Output, 1, 2);
        assert_eq!(top.y, 30.0);
        assert_eq!(bottom.y, 50.0);

        let middle = port_anchor(Point::ORIGIN, PortSide::Input, 1, 3);
        assert_eq!(middle.y, 40.0);
    }

    #[test]
    fn test_curve_control_offset_is_capped() {
        let near = CubicCurve::between(Point::new(0.0, 0.0), Point::new(100.0, 50.0));
        assert_eq!(near.control1, Point::new(50.0, 0.0));
        assert_eq!(near.control2, Point::new(50.0, 50.0));

        let far = CubicCurve::between(Point::new(0.0, 0.0), Point::new(1000.0, 0.0));
        assert_eq!(far.control1.x, 150.0);
        assert_eq!(far.control2.x, 850.0);
        assert!(far.to_svg_path().starts_with("M 0 0 C 150 0"));
    }

    #[test]
    fn test_hit_test() {
        let node = node_at(0.0, 0.0, 1, 2);
        let id = node.id.clone();
        let nodes = vec![node];

        assert_eq!(hit_test(&nodes, Point::new(100.0, 40.0)), HitTarget::Node(id.clone()));
        assert_eq!(
            hit_test(&nodes, Point::new(212.0, 50.0)),
            HitTarget::OutputHandle {
                node_id: id.clone(),
                index: 1
            }
        );
        assert_eq!(
            hit_test(&nodes, Point::new(-12.0, 40.0)),
            HitTarget::InputHandle { node_id: id, index: 0 }
        );
        assert_eq!(hit_test(&nodes, Point::new(500.0, 500.0)), HitTarget::Background);
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let below = node_at(0.0, 0.0, 1, 1);
        let above = node_at(50.0, 20.0, 1, 1);
        let above_id = above.id.clone();
        let nodes = vec![below, above];

        assert_eq!(hit_test(&nodes, Point::new(100.0, 40.0)), HitTarget::Node(above_id));
    }

    #[test]
    fn test_connection_curve_requires_both_endpoints() {
        let a = node_at(0.0, 0.0, 0, 1);
        let b = node_at(400.0, 0.0, 1, 0);
        let connection = Connection {
            id: crate::types::ConnectionId::new("c"),
            source_id: a.id.clone(),
            source_output: 0,
            target_id: b.id.clone(),
            target_input: 0,
        };

        let curve = connection_curve(&[a.clone(), b], &connection).unwrap();
        assert_eq!(curve.start, Point::new(212.0, 40.0));
        assert_eq!(curve.end, Point::new(388.0, 40.0));

        assert!(connection_curve(&[a], &connection).is_none());
    }
}
