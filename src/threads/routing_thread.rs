//! Routing worker thread.
//!
//! Dijkstra over a large venue graph is pure computation but not free; it
//! runs here instead of the owner loop. Requests carry a generation counter
//! and the worker always drains to the newest pending request before
//! computing, so a rapid sequence of destination changes costs one
//! computation, not one per change. The owner applies only outcomes whose
//! generation matches its latest request.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::core::PlanPoint;
use crate::error::{NavError, Result};
use crate::graph::{FloorGraph, NodeId};
use crate::routing::{PathfindingEngine, RouteResult, RoutingError};

/// A route query handed to the worker.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Monotonic query counter; the owner drops outcomes from earlier
    /// generations.
    pub generation: u64,
    /// Live user position on the floorplan.
    pub live: PlanPoint,
    /// Destination node.
    pub destination: NodeId,
    /// Snapshot to route over.
    pub graph: Arc<FloorGraph>,
}

/// A finished route query.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub generation: u64,
    pub destination: NodeId,
    pub result: std::result::Result<RouteResult, RoutingError>,
}

/// Routing worker thread handle.
pub struct RoutingThread {
    handle: JoinHandle<()>,
}

impl RoutingThread {
    /// Spawn the routing worker.
    ///
    /// The thread exits when the request channel disconnects.
    pub fn spawn(
        requests_rx: crossbeam_channel::Receiver<RouteRequest>,
        outcomes_tx: crossbeam_channel::Sender<RouteOutcome>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("routing".into())
            .spawn(move || {
                run_routing_loop(requests_rx, outcomes_tx);
            })
            .map_err(|e| NavError::SessionUnavailable(format!("routing thread: {e}")))?;

        Ok(Self { handle })
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_routing_loop(
    requests_rx: crossbeam_channel::Receiver<RouteRequest>,
    outcomes_tx: crossbeam_channel::Sender<RouteOutcome>,
) {
    let engine = PathfindingEngine::new();
    log::info!("routing thread started");

    while let Ok(mut request) = requests_rx.recv() {
        // Last request wins: skip straight to the newest pending query.
        while let Ok(newer) = requests_rx.try_recv() {
            request = newer;
        }

        let result = engine.find_route(&request.graph, request.live, request.destination);
        if let Err(ref e) = result {
            log::debug!(
                "route query {} to node {} failed: {e}",
                request.generation,
                request.destination
            );
        }

        let outcome = RouteOutcome {
            generation: request.generation,
            destination: request.destination,
            result,
        };
        if outcomes_tx.send(outcome).is_err() {
            break; // owner gone
        }
    }

    log::info!("routing thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, NodeKind};

    fn small_graph() -> Arc<FloorGraph> {
        Arc::new(FloorGraph {
            floor_id: 1,
            nodes: vec![
                Node {
                    id: 1,
                    floor_id: 1,
                    label: "a".into(),
                    kind: NodeKind::Intersection,
                    x: 0.0,
                    y: 0.0,
                    anchor_id: String::new(),
                },
                Node {
                    id: 2,
                    floor_id: 1,
                    label: "b".into(),
                    kind: NodeKind::Room,
                    x: 10.0,
                    y: 0.0,
                    anchor_id: String::new(),
                },
            ],
            edges: vec![Edge {
                id: 1,
                floor_id: 1,
                from_node: 1,
                to_node: 2,
                weight: 0.0,
                kind: NodeKind::Hallway,
            }],
        })
    }

    #[test]
    fn test_worker_drains_to_newest_request() {
        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = crossbeam_channel::unbounded();

        let graph = small_graph();
        // Queue three requests before the worker starts; only the newest
        // generation must be answered.
        for generation in 1..=3 {
            req_tx
                .send(RouteRequest {
                    generation,
                    live: PlanPoint::new(0.0, 1.0),
                    destination: 2,
                    graph: Arc::clone(&graph),
                })
                .unwrap();
        }

        let worker = RoutingThread::spawn(req_rx, out_tx).unwrap();
        let outcome = out_rx
            .recv_timeout(std::time::Duration::from_secs(2))
            .unwrap();
        assert_eq!(outcome.generation, 3);
        assert!(outcome.result.is_ok());

        drop(req_tx);
        worker.join().unwrap();
    }
}
