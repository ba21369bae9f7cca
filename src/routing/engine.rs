//! Dijkstra routing from an off-graph position to a destination node.
//!
//! The live user position is not a graph vertex, so a query runs in two
//! stages: a single full Dijkstra rooted at the *destination* gateway (no
//! early exit), then an entry-gateway selection that reuses the computed
//! distances for every candidate. Rooting at the destination keeps the whole
//! query at one O((V+E) log V) pass instead of one pass per candidate entry
//! point.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::core::PlanPoint;
use crate::graph::{FloorGraph, NodeId};

/// Error types for route queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// Destination id is not in the snapshot.
    UnknownDestination,

    /// Destination unreachable: no gateway candidates, or the user's graph
    /// entry lies in a component disconnected from the destination.
    NoRouteFound,
}

impl std::fmt::Display for RoutingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingError::UnknownDestination => write!(f, "Destination node not in graph"),
            RoutingError::NoRouteFound => write!(f, "No route to destination"),
        }
    }
}

impl std::error::Error for RoutingError {}

/// A computed route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    /// Destination node the query was for.
    pub destination: NodeId,
    /// Graph nodes along the walked path, entry gateway first.
    pub nodes: Vec<NodeId>,
    /// Rendered point sequence: user position, path node coordinates, and
    /// the destination coordinate when the gateway is not the destination
    /// itself.
    pub points: Vec<PlanPoint>,
}

/// Stateless route computation over a floor snapshot.
///
/// Every call is independent; supersession of in-flight queries is handled
/// by the session owner via result generations, not here.
#[derive(Debug, Default)]
pub struct PathfindingEngine;

impl PathfindingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute a route from a live floorplan position to a destination node.
    pub fn find_route(
        &self,
        graph: &FloorGraph,
        live: PlanPoint,
        destination: NodeId,
    ) -> Result<RouteResult, RoutingError> {
        let dest_node = graph
            .node(destination)
            .ok_or(RoutingError::UnknownDestination)?;
        let dest_coord = dest_node.position();

        let adjacency = build_adjacency(graph);

        // Edge-bearing nodes sorted by id: the stable iteration order every
        // later minimization uses for tie-breaking.
        let mut gateway_candidates: Vec<NodeId> = adjacency.keys().copied().collect();
        gateway_candidates.sort_unstable();

        if gateway_candidates.is_empty() {
            return Err(RoutingError::NoRouteFound);
        }

        // A destination with no incident edge routes via the nearest
        // edge-bearing node instead.
        let dest_gateway = if adjacency.contains_key(&destination) {
            destination
        } else {
            nearest_by(&gateway_candidates, |id| {
                graph.node(id).map(|n| n.position().distance(&dest_coord))
            })
            .ok_or(RoutingError::NoRouteFound)?
        };

        let (dist, prev) = dijkstra(&adjacency, dest_gateway);

        // The user physically enters the graph at the Euclidean-nearest
        // edge-bearing node; if that node cannot reach the destination the
        // two are in disconnected components and there is no route.
        let user_entry = nearest_by(&gateway_candidates, |id| {
            graph.node(id).map(|n| n.position().distance(&live))
        })
        .ok_or(RoutingError::NoRouteFound)?;
        if !dist.contains_key(&user_entry) {
            return Err(RoutingError::NoRouteFound);
        }

        // Entry gateway: minimize walk-to-node + graph-distance-to-dest over
        // all reachable candidates. Ties resolve to the lowest node id.
        let entry_gateway = nearest_by(&gateway_candidates, |id| {
            let to_dest = dist.get(&id)?;
            let node = graph.node(id)?;
            Some(node.position().distance(&live) + to_dest)
        })
        .ok_or(RoutingError::NoRouteFound)?;

        let nodes = reconstruct(&prev, entry_gateway, dest_gateway);

        let mut points = Vec::with_capacity(nodes.len() + 2);
        points.push(live);
        for &id in &nodes {
            if let Some(node) = graph.node(id) {
                points.push(node.position());
            }
        }
        if dest_gateway != destination || nodes.is_empty() {
            points.push(dest_coord);
        }

        Ok(RouteResult {
            destination,
            nodes,
            points,
        })
    }
}

/// Undirected weighted adjacency; only edge-bearing nodes appear as keys.
fn build_adjacency(graph: &FloorGraph) -> HashMap<NodeId, Vec<(NodeId, f32)>> {
    let mut adjacency: HashMap<NodeId, Vec<(NodeId, f32)>> = HashMap::new();
    for edge in &graph.edges {
        if graph.node(edge.from_node).is_none() || graph.node(edge.to_node).is_none() {
            continue;
        }
        let weight = graph.edge_weight(edge);
        adjacency
            .entry(edge.from_node)
            .or_default()
            .push((edge.to_node, weight));
        adjacency
            .entry(edge.to_node)
            .or_default()
            .push((edge.from_node, weight));
    }
    adjacency
}

/// Candidate in `ids` minimizing `score`, first (lowest id) on ties.
/// Candidates for which `score` returns `None` are skipped.
fn nearest_by<F>(ids: &[NodeId], score: F) -> Option<NodeId>
where
    F: Fn(NodeId) -> Option<f32>,
{
    let mut best: Option<(NodeId, f32)> = None;
    for &id in ids {
        let Some(s) = score(id) else { continue };
        match best {
            Some((_, bs)) if s >= bs => {}
            _ => best = Some((id, s)),
        }
    }
    best.map(|(id, _)| id)
}

/// Entry in the Dijkstra frontier, min-ordered by cost.
#[derive(Clone)]
struct FrontierNode {
    id: NodeId,
    cost: f32,
}

impl Eq for FrontierNode {}

impl PartialEq for FrontierNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Ord for FrontierNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (lower cost = higher priority)
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for FrontierNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Full Dijkstra from `root` with no early exit.
///
/// Returns distance-to-root and predecessor-toward-root for every reachable
/// node. `prev[n]` is the neighbor of `n` one step closer to the root.
fn dijkstra(
    adjacency: &HashMap<NodeId, Vec<(NodeId, f32)>>,
    root: NodeId,
) -> (HashMap<NodeId, f32>, HashMap<NodeId, NodeId>) {
    let mut dist: HashMap<NodeId, f32> = HashMap::new();
    let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
    let mut frontier = BinaryHeap::new();

    dist.insert(root, 0.0);
    frontier.push(FrontierNode { id: root, cost: 0.0 });

    while let Some(current) = frontier.pop() {
        let current_dist = *dist.get(&current.id).unwrap_or(&f32::INFINITY);
        if current.cost > current_dist {
            continue; // stale heap entry
        }

        let Some(neighbors) = adjacency.get(&current.id) else {
            continue;
        };
        for &(neighbor, weight) in neighbors {
            let tentative = current_dist + weight;
            if tentative < *dist.get(&neighbor).unwrap_or(&f32::INFINITY) {
                dist.insert(neighbor, tentative);
                prev.insert(neighbor, current.id);
                frontier.push(FrontierNode {
                    id: neighbor,
                    cost: tentative,
                });
            }
        }
    }

    (dist, prev)
}

/// Walk predecessors from `entry` to `root`.
fn reconstruct(prev: &HashMap<NodeId, NodeId>, entry: NodeId, root: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![entry];
    let mut current = entry;
    while current != root {
        match prev.get(&current) {
            Some(&next) => {
                nodes.push(next);
                current = next;
            }
            None => break,
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, NodeKind};
    use approx::assert_relative_eq;

    fn node_at(id: NodeId, x: f32, y: f32) -> Node {
        Node {
            id,
            floor_id: 1,
            label: format!("n{id}"),
            kind: NodeKind::Intersection,
            x,
            y,
            anchor_id: String::new(),
        }
    }

    fn edge(id: u32, from: NodeId, to: NodeId, weight: f32) -> Edge {
        Edge {
            id,
            floor_id: 1,
            from_node: from,
            to_node: to,
            weight,
            kind: NodeKind::Hallway,
        }
    }

    /// Line graph 1-2-3-4 with weights [1, 2, 3], nodes spaced 10 apart.
    fn line_graph() -> FloorGraph {
        FloorGraph {
            floor_id: 1,
            nodes: vec![
                node_at(1, 0.0, 0.0),
                node_at(2, 10.0, 0.0),
                node_at(3, 20.0, 0.0),
                node_at(4, 30.0, 0.0),
            ],
            edges: vec![edge(1, 1, 2, 1.0), edge(2, 2, 3, 2.0), edge(3, 3, 4, 3.0)],
        }
    }

    #[test]
    fn test_dijkstra_line_graph() {
        let graph = line_graph();
        let adjacency = build_adjacency(&graph);
        let (dist, _) = dijkstra(&adjacency, 4);

        assert_relative_eq!(*dist.get(&1).unwrap(), 6.0);
        assert_relative_eq!(*dist.get(&2).unwrap(), 5.0);
        assert_relative_eq!(*dist.get(&3).unwrap(), 3.0);
    }

    #[test]
    fn test_route_along_line() {
        let engine = PathfindingEngine::new();
        let graph = line_graph();

        let route = engine
            .find_route(&graph, PlanPoint::new(0.0, 1.0), 4)
            .unwrap();

        assert_eq!(route.nodes, vec![1, 2, 3, 4]);
        // [user] + 4 node coords; destination is its own gateway.
        assert_eq!(route.points.len(), 5);
        assert_relative_eq!(route.points[0].x, 0.0);
        assert_relative_eq!(route.points[4].x, 30.0);
    }

    #[test]
    fn test_derived_weights_from_euclidean() {
        let mut graph = line_graph();
        for e in &mut graph.edges {
            e.weight = 0.0; // derive from coordinates: each hop is 10
        }
        let adjacency = build_adjacency(&graph);
        let (dist, _) = dijkstra(&adjacency, 4);
        assert_relative_eq!(*dist.get(&1).unwrap(), 30.0);
    }

    #[test]
    fn test_gateway_selection_for_edgeless_destination() {
        // Destination 9 has no edges; candidates at Euclidean distances
        // {5, 3, 8} from it. The distance-3 candidate is the gateway.
        let graph = FloorGraph {
            floor_id: 1,
            nodes: vec![
                node_at(9, 0.0, 0.0),
                node_at(1, 5.0, 0.0),
                node_at(2, 0.0, 3.0),
                node_at(3, -8.0, 0.0),
            ],
            edges: vec![edge(1, 1, 2, 0.0), edge(2, 2, 3, 0.0)],
        };
        let engine = PathfindingEngine::new();

        let route = engine
            .find_route(&graph, PlanPoint::new(5.0, 1.0), 9)
            .unwrap();

        // Walked path ends at node 2, the distance-3 candidate.
        assert_eq!(*route.nodes.last().unwrap(), 2);
        // Destination coordinate appended since the gateway is not the
        // destination itself.
        let last = route.points.last().unwrap();
        assert_relative_eq!(last.x, 0.0);
        assert_relative_eq!(last.y, 0.0);
    }

    #[test]
    fn test_entry_optimality_prefers_graph_distance() {
        // A and B equidistant from the user, but B is graph-distance 2 from
        // the destination while A is 10.
        let graph = FloorGraph {
            floor_id: 1,
            nodes: vec![
                node_at(1, 0.0, 0.0),  // destination
                node_at(2, 10.0, 0.0), // B
                node_at(3, 10.0, 8.0), // A
            ],
            edges: vec![edge(1, 2, 1, 2.0), edge(2, 3, 1, 10.0)],
        };
        let engine = PathfindingEngine::new();

        // (14, 4) is equidistant from B (10,0) and A (10,8).
        let route = engine
            .find_route(&graph, PlanPoint::new(14.0, 4.0), 1)
            .unwrap();

        assert_eq!(route.nodes, vec![2, 1]);
    }

    #[test]
    fn test_entry_tie_breaks_by_lowest_id() {
        // Two entries with identical combined cost; the lower id wins.
        let graph = FloorGraph {
            floor_id: 1,
            nodes: vec![
                node_at(1, 0.0, 0.0),
                node_at(2, -10.0, 0.0),
                node_at(3, 10.0, 0.0),
            ],
            edges: vec![edge(1, 2, 1, 5.0), edge(2, 3, 1, 5.0)],
        };
        let engine = PathfindingEngine::new();

        let route = engine
            .find_route(&graph, PlanPoint::new(0.0, 10.0), 1)
            .unwrap();
        assert_eq!(route.nodes[0], 2);
    }

    #[test]
    fn test_no_route_across_disconnected_components() {
        // User stands next to component {1-2}; destination 4 lives in the
        // separate component {3-4}.
        let graph = FloorGraph {
            floor_id: 1,
            nodes: vec![
                node_at(1, 0.0, 0.0),
                node_at(2, 10.0, 0.0),
                node_at(3, 100.0, 0.0),
                node_at(4, 110.0, 0.0),
            ],
            edges: vec![edge(1, 1, 2, 1.0), edge(2, 3, 4, 1.0)],
        };
        let engine = PathfindingEngine::new();

        let result = engine.find_route(&graph, PlanPoint::new(1.0, 1.0), 4);
        assert_eq!(result.unwrap_err(), RoutingError::NoRouteFound);
    }

    #[test]
    fn test_no_route_without_any_edges() {
        let graph = FloorGraph {
            floor_id: 1,
            nodes: vec![node_at(1, 0.0, 0.0), node_at(2, 5.0, 0.0)],
            edges: vec![],
        };
        let engine = PathfindingEngine::new();

        let result = engine.find_route(&graph, PlanPoint::new(1.0, 1.0), 2);
        assert_eq!(result.unwrap_err(), RoutingError::NoRouteFound);
    }

    #[test]
    fn test_unknown_destination() {
        let engine = PathfindingEngine::new();
        let result = engine.find_route(&line_graph(), PlanPoint::new(0.0, 0.0), 99);
        assert_eq!(result.unwrap_err(), RoutingError::UnknownDestination);
    }

    #[test]
    fn test_user_already_at_destination_gateway() {
        let engine = PathfindingEngine::new();
        let graph = line_graph();

        let route = engine
            .find_route(&graph, PlanPoint::new(30.0, 0.5), 4)
            .unwrap();

        // Entry gateway equals the destination gateway: single-node path.
        assert_eq!(route.nodes, vec![4]);
        assert_eq!(route.points.len(), 2);
    }
}
