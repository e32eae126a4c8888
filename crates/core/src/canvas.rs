//! Pointer gesture handling for the editor canvas.
//!
//! The controller turns raw pointer, wheel and drop events into store
//! mutations. Exactly one gesture is active between a pointer-down and the
//! matching pointer-up.

use crate::catalog::NodeCatalog;
use crate::geometry::{hit_test, output_anchor, HitTarget, Viewport};
use crate::store::{WorkflowStore, ZOOM_STEP};
use crate::types::{Connection, NodeId, NodeType, Point, WorkflowNode};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// Pointer press in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub button: PointerButton,
}

impl PointerEvent {
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            button: PointerButton::Primary,
        }
    }
}

/// Gesture currently in progress
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Idle,
    /// Screen-space difference between the pointer and the pan offset at grab time
    Panning { grab: Point },
    /// Canvas-space offset between the pointer and the node's position
    DraggingNode { node_id: NodeId, offset: Point },
    Connecting,
}

/// Result of a wheel event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelOutcome {
    pub zoom: f64,
    /// The host must suppress the default page scroll
    pub prevent_default: bool,
}

pub struct CanvasController {
    origin: Point,
    cursor: Point,
    gesture: Gesture,
    catalog: Option<Arc<NodeCatalog>>,
}

impl CanvasController {
    /// `origin` is the screen position of the canvas element's top-left corner
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            cursor: origin,
            gesture: Gesture::Idle,
            catalog: None,
        }
    }

    /// Dropped node types known to `catalog` share its entries
    pub fn with_catalog(mut self, catalog: Arc<NodeCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Last pointer position seen, in screen space
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn viewport(&self, store: &WorkflowStore) -> Viewport {
        Viewport::from_canvas(self.origin, store.canvas())
    }

    pub fn pointer_down(&mut self, store: &mut WorkflowStore, event: PointerEvent) -> HitTarget {
        self.cursor = event.position;
        let viewport = self.viewport(store);
        let point = viewport.screen_to_canvas(event.position);
        let target = hit_test(store.nodes(), point);

        if self.gesture != Gesture::Idle {
            return target;
        }

        match &target {
            HitTarget::Background => {
                store.select_node(None);
                if event.button == PointerButton::Primary {
                    self.gesture = Gesture::Panning {
                        grab: event.position - store.canvas().pan,
                    };
                }
            }
            HitTarget::Node(node_id) => {
                if event.button == PointerButton::Primary {
                    if let Some(node) = store.node(node_id) {
                        let offset = point - node.position;
                        store.select_node(Some(node_id.clone()));
                        self.gesture = Gesture::DraggingNode {
                            node_id: node_id.clone(),
                            offset,
                        };
                    }
                }
            }
            HitTarget::OutputHandle { node_id, index } => {
                if event.button == PointerButton::Primary {
                    store.start_connecting(node_id.clone(), *index);
                    self.gesture = Gesture::Connecting;
                }
            }
            HitTarget::InputHandle { .. } => {}
        }

        target
    }

    pub fn pointer_move(&mut self, store: &mut WorkflowStore, position: Point) {
        self.cursor = position;

        match &self.gesture {
            Gesture::Panning { grab } => store.set_pan(position - *grab),
            Gesture::DraggingNode { node_id, offset } => {
                let point = self.viewport(store).screen_to_canvas(position);
                store.update_node_position(node_id, point - *offset);
            }
            Gesture::Connecting | Gesture::Idle => {}
        }
    }

    /// End the active gesture. A connection gesture released over another
    /// node's input handle creates the connection.
    pub fn pointer_up(&mut self, store: &mut WorkflowStore, position: Point) -> Option<Connection> {
        self.cursor = position;
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);

        if gesture != Gesture::Connecting {
            return None;
        }

        let source = store.canvas().connecting_from.clone()?;
        let point = self.viewport(store).screen_to_canvas(position);

        match hit_test(store.nodes(), point) {
            HitTarget::InputHandle { node_id, index } if node_id != source.node_id => {
                store.end_connecting(Some(&node_id), Some(index))
            }
            _ => store.end_connecting(None, None),
        }
    }

    /// Pointer left the canvas: any gesture is abandoned
    pub fn pointer_leave(&mut self, store: &mut WorkflowStore) {
        if self.gesture == Gesture::Connecting {
            store.end_connecting(None, None);
        }
        self.gesture = Gesture::Idle;
    }

    /// Zoom one step per wheel event: scrolling down zooms out
    pub fn wheel(&mut self, store: &mut WorkflowStore, delta_y: f64) -> WheelOutcome {
        let step = if delta_y > 0.0 { -ZOOM_STEP } else { ZOOM_STEP };
        store.set_zoom(store.canvas().zoom + step);

        WheelOutcome {
            zoom: store.canvas().zoom,
            prevent_default: true,
        }
    }

    /// Place a node type dragged in from the palette. The payload is the JSON
    /// form of the node type; anything unparsable is ignored.
    pub fn drop_payload(
        &mut self,
        store: &mut WorkflowStore,
        payload: &str,
        position: Point,
    ) -> Option<WorkflowNode> {
        let node_type: NodeType = match serde_json::from_str(payload) {
            Ok(node_type) => node_type,
            Err(e) => {
                tracing::debug!("Ignoring malformed drop payload: {}", e);
                return None;
            }
        };

        let shared = self
            .catalog
            .as_ref()
            .and_then(|catalog| catalog.get(&node_type.id))
            .filter(|shared| **shared == node_type);
        let node_type = shared.unwrap_or_else(|| Arc::new(node_type));

        let at = self.viewport(store).drop_position(position);
        Some(store.add_node(node_type, at))
    }

    /// Place a node picked from the search dialog at the middle of the visible canvas
    pub fn place_at_center(
        &self,
        store: &mut WorkflowStore,
        node_type: Arc<NodeType>,
        viewport_size: Point,
    ) -> WorkflowNode {
        let at = self.viewport(store).center_position(viewport_size);
        store.add_node(node_type, at)
    }

    /// Rubber-band segment (canvas space) from the source anchor to the cursor
    /// while a connection is being drawn
    pub fn preview(&self, store: &WorkflowStore) -> Option<(Point, Point)> {
        let from = store.canvas().connecting_from.as_ref()?;
        let node = store.node(&from.node_id)?;

        Some((
            output_anchor(node, from.output),
            self.viewport(store).screen_to_canvas(self.cursor),
        ))
    }
}
