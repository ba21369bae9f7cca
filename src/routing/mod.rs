//! Shortest-path routing over the floorplan graph.

pub mod engine;

pub use engine::{PathfindingEngine, RouteResult, RoutingError};
