//! Floorplan graph snapshot types.
//!
//! The graph store (persistence, editing) lives outside this crate; it hands
//! the engine a read-only per-floor snapshot of nodes and edges. Snapshots
//! are replaced wholesale on change and never mutated in place, so the
//! scheduler and router can read them without locking. `FloorGraph`
//! implements `PartialEq` so redundant snapshot updates can be skipped by
//! value equality.

use serde::{Deserialize, Serialize};

use crate::core::PlanPoint;

/// Stable integer handle for a graph node.
pub type NodeId = u32;

/// Stable integer handle for a graph edge.
pub type EdgeId = u32;

/// What a node represents on the floorplan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    Room,
    Booth,
    #[default]
    Intersection,
    Connector,
    Hallway,
    Stairs,
    Elevator,
}

/// A vertex of the per-floor navigation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable id, unique within the floor.
    pub id: NodeId,
    /// Floor this node belongs to.
    pub floor_id: u32,
    /// Display label ("Booth 214", "Elevator B").
    pub label: String,
    /// Node category.
    pub kind: NodeKind,
    /// X coordinate in floorplan units.
    pub x: f32,
    /// Y coordinate in floorplan units.
    pub y: f32,
    /// Cloud anchor id this node is bound to; empty if unbound.
    pub anchor_id: String,
}

impl Node {
    /// Floorplan position of this node.
    #[inline]
    pub fn position(&self) -> PlanPoint {
        PlanPoint::new(self.x, self.y)
    }

    /// Whether the node has a persisted anchor to resolve.
    #[inline]
    pub fn has_anchor(&self) -> bool {
        !self.anchor_id.is_empty()
    }
}

/// An edge of the navigation graph. Undirected for routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Stable id, unique within the floor.
    pub id: EdgeId,
    /// Floor this edge belongs to.
    pub floor_id: u32,
    /// One endpoint.
    pub from_node: NodeId,
    /// Other endpoint.
    pub to_node: NodeId,
    /// Traversal weight; 0 means "derive from Euclidean distance of endpoints".
    pub weight: f32,
    /// Edge category (same vocabulary as nodes; Hallway for plain corridors).
    pub kind: NodeKind,
}

/// Immutable per-floor snapshot of the navigation graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FloorGraph {
    /// Floor this snapshot describes.
    pub floor_id: u32,
    /// All nodes on the floor.
    pub nodes: Vec<Node>,
    /// All edges on the floor.
    pub edges: Vec<Edge>,
}

impl FloorGraph {
    /// Create an empty snapshot for a floor.
    pub fn new(floor_id: u32) -> Self {
        Self {
            floor_id,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Ids of all nodes in the snapshot.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Effective routing weight of an edge.
    ///
    /// A stored weight of 0 means the author did not set one; fall back to
    /// the Euclidean distance between the endpoints.
    pub fn edge_weight(&self, edge: &Edge) -> f32 {
        if edge.weight > 0.0 {
            return edge.weight;
        }
        match (self.node(edge.from_node), self.node(edge.to_node)) {
            (Some(a), Some(b)) => a.position().distance(&b.position()),
            _ => 0.0,
        }
    }

    /// Whether a node has at least one incident edge.
    pub fn has_incident_edge(&self, id: NodeId) -> bool {
        self.edges
            .iter()
            .any(|e| e.from_node == id || e.to_node == id)
    }
}
