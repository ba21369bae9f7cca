//! Reference frame estimation between the AR world frame and the floorplan.
//!
//! The estimator maintains the single rotation+scale+translation relationship
//! that lets the engine convert both ways. It is an explicit three-state
//! machine:
//!
//! - `NoReference`: nothing resolved and tracked yet; no conversion possible.
//! - `Localizing`: one anchor pins translation; rotation assumed 0 until a
//!   second anchor is available.
//! - `Localized`: two or more anchors; rotation estimated and refined
//!   opportunistically.
//!
//! The reference anchor is sticky: once selected it is never swapped for a
//! "closer" anchor while still valid, only cleared when it is unresolved or
//! removed from the snapshot.

use crate::anchors::AnchorRegistry;
use crate::core::math::{bearing_deg, normalize_deg, rotate_deg};
use crate::core::{PlanPoint, WorldPoint, WorldPose};
use crate::graph::{FloorGraph, NodeId};

/// Estimation state of the reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FrameState {
    /// No resolved, tracked anchor available.
    #[default]
    NoReference,
    /// One anchor pins translation; rotation unknown (treated as 0°).
    Localizing { reference: NodeId },
    /// Rotation estimated from at least two anchors.
    Localized { reference: NodeId, rotation_deg: f32 },
}

/// A self-contained snapshot of the current frame relationship.
///
/// Everything needed to convert between frames, detached from the registry
/// and graph so it can be handed to other threads (the scheduler's priority
/// pass runs off the owner thread and works from one of these).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameEstimate {
    /// Reference node the frame is pinned to.
    pub reference: NodeId,
    /// Reference node's floorplan position.
    pub reference_plan: PlanPoint,
    /// Reference anchor's resolved world position.
    pub reference_world: WorldPoint,
    /// Rotation offset in degrees; 0 while only one anchor is resolved.
    pub rotation_deg: f32,
    /// World-units per floorplan-unit.
    pub scale_factor: f32,
}

impl FrameEstimate {
    /// Predicted AR world position for a floorplan point.
    pub fn predict_world(&self, plan: PlanPoint) -> WorldPoint {
        let dx = plan.x - self.reference_plan.x;
        let dy = plan.y - self.reference_plan.y;
        let (rx, ry) = rotate_deg(dx, dy, -self.rotation_deg);
        WorldPoint::new(
            self.reference_world.x + rx * self.scale_factor,
            self.reference_world.y,
            self.reference_world.z + ry * self.scale_factor,
        )
    }

    /// Floorplan point for an AR world position. Inverse of
    /// [`predict_world`](Self::predict_world).
    pub fn map_to_plan(&self, world: &WorldPoint) -> PlanPoint {
        let (dx, dz) = self.reference_world.planar_delta(world);
        let (rx, ry) = rotate_deg(dx, dz, self.rotation_deg);
        PlanPoint::new(
            self.reference_plan.x + rx / self.scale_factor,
            self.reference_plan.y + ry / self.scale_factor,
        )
    }
}

/// Converts between AR world coordinates and floorplan coordinates.
#[derive(Debug)]
pub struct ReferenceFrameEstimator {
    state: FrameState,
    /// World-units per floorplan-unit. Fixed calibration constant.
    scale_factor: f32,
}

impl ReferenceFrameEstimator {
    pub fn new(scale_factor: f32) -> Self {
        Self {
            state: FrameState::NoReference,
            scale_factor,
        }
    }

    /// Current estimation state.
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// The reference node, if one is set.
    pub fn reference(&self) -> Option<NodeId> {
        match self.state {
            FrameState::NoReference => None,
            FrameState::Localizing { reference } | FrameState::Localized { reference, .. } => {
                Some(reference)
            }
        }
    }

    /// Estimated rotation offset in degrees, if known.
    pub fn rotation_deg(&self) -> Option<f32> {
        match self.state {
            FrameState::Localized { rotation_deg, .. } => Some(rotation_deg),
            _ => None,
        }
    }

    /// Drop the reference frame entirely.
    pub fn reset(&mut self) {
        if self.state != FrameState::NoReference {
            log::info!("reference frame reset");
        }
        self.state = FrameState::NoReference;
    }

    /// Clear the frame if its reference node was removed from the snapshot.
    pub fn invalidate_nodes(&mut self, removed: &[NodeId]) {
        if let Some(reference) = self.reference() {
            if removed.contains(&reference) {
                self.reset();
            }
        }
    }

    /// Re-evaluate the frame against the current registry and tracked set.
    ///
    /// `tracked` holds ids of anchors the AR subsystem is currently tracking;
    /// only Resolved members count. Called once per owner tick. Selection is
    /// sticky; rotation is recomputed on every opportunity from the reference
    /// and the lowest-id other tracked anchor.
    pub fn observe(&mut self, tracked: &[NodeId], graph: &FloorGraph, registry: &AnchorRegistry) {
        // A reference that is gone or no longer Resolved invalidates the frame.
        if let Some(reference) = self.reference() {
            if graph.node(reference).is_none() || !registry.is_resolved(reference) {
                self.reset();
            }
        }

        let mut candidates: Vec<NodeId> = tracked
            .iter()
            .copied()
            .filter(|&id| registry.is_resolved(id) && graph.node(id).is_some())
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        if self.reference().is_none() {
            let Some(&first) = candidates.first() else {
                return;
            };
            log::info!("reference anchor selected: node {first}");
            self.state = FrameState::Localizing { reference: first };
        }

        let reference = match self.reference() {
            Some(r) => r,
            None => return,
        };

        let Some(&other) = candidates.iter().find(|&&id| id != reference) else {
            return;
        };

        if let Some(rotation_deg) = self.estimate_rotation(reference, other, graph, registry) {
            self.state = FrameState::Localized {
                reference,
                rotation_deg,
            };
        }
    }

    /// Rotation offset from a pair of resolved anchors.
    ///
    /// Bearing of the pair in the AR frame vs. bearing of the same pair on
    /// the floorplan; the difference is how much the floorplan is rotated
    /// relative to the world frame.
    fn estimate_rotation(
        &self,
        a: NodeId,
        b: NodeId,
        graph: &FloorGraph,
        registry: &AnchorRegistry,
    ) -> Option<f32> {
        let node_a = graph.node(a)?;
        let node_b = graph.node(b)?;
        let world_a = registry.resolved_pose(a)?.position;
        let world_b = registry.resolved_pose(b)?.position;

        let (dx, dz) = world_a.planar_delta(&world_b);
        let ar_bearing = bearing_deg(dx, dz);
        let plan_bearing = bearing_deg(node_b.x - node_a.x, node_b.y - node_a.y);

        Some(normalize_deg(plan_bearing - ar_bearing))
    }

    /// Detached snapshot of the current frame relationship, or `None` while
    /// no reference exists.
    pub fn estimate(
        &self,
        graph: &FloorGraph,
        registry: &AnchorRegistry,
    ) -> Option<FrameEstimate> {
        let reference = self.reference()?;
        let ref_node = graph.node(reference)?;
        let ref_world = registry.resolved_pose(reference)?.position;

        Some(FrameEstimate {
            reference,
            reference_plan: ref_node.position(),
            reference_world: ref_world,
            rotation_deg: self.rotation_deg().unwrap_or(0.0),
            scale_factor: self.scale_factor,
        })
    }

    /// Predicted AR world position of a node.
    ///
    /// Plan delta from the reference, rotated by the negated offset, scaled
    /// into world units, applied to the reference's world position. With
    /// only one anchor the rotation is taken as 0°. Returns `None` while no
    /// reference exists.
    pub fn predict_world_position(
        &self,
        target: NodeId,
        graph: &FloorGraph,
        registry: &AnchorRegistry,
    ) -> Option<WorldPoint> {
        let estimate = self.estimate(graph, registry)?;
        let target_node = graph.node(target)?;
        Some(estimate.predict_world(target_node.position()))
    }

    /// Floorplan coordinate of a device pose. Inverse of
    /// [`predict_world_position`](Self::predict_world_position).
    pub fn map_coordinate_from_pose(
        &self,
        pose: &WorldPose,
        graph: &FloorGraph,
        registry: &AnchorRegistry,
    ) -> Option<PlanPoint> {
        let estimate = self.estimate(graph, registry)?;
        Some(estimate.map_to_plan(&pose.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::{
        AnchorService, HostRequest, ResolveRequest, ResolveUpdate,
    };
    use crate::graph::{Node, NodeKind};
    use approx::assert_relative_eq;

    struct NullService;
    impl AnchorService for NullService {
        fn resolve(&self, _request: ResolveRequest) {}
        fn host(&self, _request: HostRequest) {}
    }

    fn node_at(id: NodeId, x: f32, y: f32) -> Node {
        Node {
            id,
            floor_id: 1,
            label: format!("n{id}"),
            kind: NodeKind::Booth,
            x,
            y,
            anchor_id: format!("cloud-{id}"),
        }
    }

    fn resolve_at(registry: &mut AnchorRegistry, id: NodeId, world: WorldPoint) {
        registry.request_resolution(id, &NullService);
        registry.apply_resolution(id, ResolveUpdate::Success(WorldPose::at(world)));
    }

    /// Graph + registry with two anchors forming a known rotation.
    fn two_anchor_fixture() -> (FloorGraph, AnchorRegistry) {
        let graph = FloorGraph {
            floor_id: 1,
            nodes: vec![node_at(1, 0.0, 0.0), node_at(2, 10.0, 0.0)],
            edges: vec![],
        };
        let mut registry = AnchorRegistry::new();
        registry.sync_nodes(&graph);
        resolve_at(&mut registry, 1, WorldPoint::new(0.0, 0.0, 0.0));
        resolve_at(&mut registry, 2, WorldPoint::new(0.0, 0.0, 7.07));
        (graph, registry)
    }

    #[test]
    fn test_no_reference_without_resolved_anchors() {
        let graph = FloorGraph {
            floor_id: 1,
            nodes: vec![node_at(1, 0.0, 0.0)],
            edges: vec![],
        };
        let mut registry = AnchorRegistry::new();
        registry.sync_nodes(&graph);

        let mut estimator = ReferenceFrameEstimator::new(1.0);
        estimator.observe(&[1], &graph, &registry);
        assert_eq!(estimator.state(), FrameState::NoReference);
        assert!(estimator
            .map_coordinate_from_pose(&WorldPose::default(), &graph, &registry)
            .is_none());
    }

    #[test]
    fn test_single_anchor_localizing_zero_rotation() {
        let graph = FloorGraph {
            floor_id: 1,
            nodes: vec![node_at(1, 5.0, 5.0), node_at(2, 8.0, 5.0)],
            edges: vec![],
        };
        let mut registry = AnchorRegistry::new();
        registry.sync_nodes(&graph);
        resolve_at(&mut registry, 1, WorldPoint::new(1.0, 0.0, 1.0));

        let mut estimator = ReferenceFrameEstimator::new(0.5);
        estimator.observe(&[1], &graph, &registry);
        assert_eq!(estimator.state(), FrameState::Localizing { reference: 1 });

        // Rotation treated as 0: plan delta (3, 0) scaled by 0.5.
        let predicted = estimator
            .predict_world_position(2, &graph, &registry)
            .unwrap();
        assert_relative_eq!(predicted.x, 2.5, epsilon = 1e-5);
        assert_relative_eq!(predicted.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sticky_reference_not_swapped() {
        let (graph, registry) = two_anchor_fixture();
        let mut estimator = ReferenceFrameEstimator::new(0.707);

        estimator.observe(&[2], &graph, &registry);
        assert_eq!(estimator.reference(), Some(2));

        // Node 1 shows up later; reference stays on 2.
        estimator.observe(&[1, 2], &graph, &registry);
        assert_eq!(estimator.reference(), Some(2));
    }

    #[test]
    fn test_rotation_estimated_with_two_anchors() {
        let (graph, registry) = two_anchor_fixture();
        let mut estimator = ReferenceFrameEstimator::new(0.707);
        estimator.observe(&[1, 2], &graph, &registry);

        // Plan bearing 0°, AR bearing 90° (delta purely along +z).
        let rotation = estimator.rotation_deg().expect("rotation known");
        assert_relative_eq!(rotation, -90.0, epsilon = 1e-3);
    }

    #[test]
    fn golden_two_anchor_scenario() {
        // Regression fixture: reference at plan (0,0) / world origin, second
        // anchor at plan (10,0) / world (0,0,7.07), scale 0.707 m per unit.
        let (graph, registry) = two_anchor_fixture();
        let mut estimator = ReferenceFrameEstimator::new(0.707);
        estimator.observe(&[1, 2], &graph, &registry);

        // Halfway along the anchor pair in the world maps to plan (~4.95, 0).
        let plan = estimator
            .map_coordinate_from_pose(
                &WorldPose::at(WorldPoint::new(0.0, 0.0, 3.5)),
                &graph,
                &registry,
            )
            .unwrap();
        assert_relative_eq!(plan.x, 4.9505, epsilon = 1e-3);
        assert_relative_eq!(plan.y, 0.0, epsilon = 1e-3);

        // And the second anchor predicts back onto its resolved world pose.
        let predicted = estimator
            .predict_world_position(2, &graph, &registry)
            .unwrap();
        assert_relative_eq!(predicted.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(predicted.z, 7.07, epsilon = 1e-3);
    }

    #[test]
    fn test_round_trip_all_nodes() {
        let graph = FloorGraph {
            floor_id: 1,
            nodes: vec![
                node_at(1, 0.0, 0.0),
                node_at(2, 10.0, 0.0),
                node_at(3, -4.0, 12.5),
                node_at(4, 7.25, -3.5),
            ],
            edges: vec![],
        };
        let mut registry = AnchorRegistry::new();
        registry.sync_nodes(&graph);
        resolve_at(&mut registry, 1, WorldPoint::new(2.0, 1.3, -1.0));
        resolve_at(&mut registry, 2, WorldPoint::new(5.0, 1.3, 2.0));

        let mut estimator = ReferenceFrameEstimator::new(1.0 / 150.0);
        estimator.observe(&[1, 2], &graph, &registry);
        assert!(estimator.rotation_deg().is_some());

        for node in &graph.nodes {
            let world = estimator
                .predict_world_position(node.id, &graph, &registry)
                .unwrap();
            let plan = estimator
                .map_coordinate_from_pose(&WorldPose::at(world), &graph, &registry)
                .unwrap();
            assert_relative_eq!(plan.x, node.x, epsilon = 1e-2);
            assert_relative_eq!(plan.y, node.y, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_reference_invalidated_on_removal() {
        let (graph, registry) = two_anchor_fixture();
        let mut estimator = ReferenceFrameEstimator::new(0.707);
        estimator.observe(&[1, 2], &graph, &registry);
        assert_eq!(estimator.reference(), Some(1));

        estimator.invalidate_nodes(&[1]);
        assert_eq!(estimator.state(), FrameState::NoReference);

        // Re-established lazily on the next observe.
        estimator.observe(&[2], &graph, &registry);
        assert_eq!(estimator.reference(), Some(2));
    }

    #[test]
    fn test_reference_invalidated_when_unresolved() {
        let (graph, mut registry) = two_anchor_fixture();
        let mut estimator = ReferenceFrameEstimator::new(0.707);
        estimator.observe(&[1, 2], &graph, &registry);
        assert_eq!(estimator.reference(), Some(1));

        // Snapshot rebinds node 1 to a different anchor; its binding drops
        // back to Unresolved and the frame must follow.
        let mut rebound = graph.clone();
        rebound.nodes[0].anchor_id = "cloud-other".to_string();
        registry.sync_nodes(&rebound);

        estimator.observe(&[], &rebound, &registry);
        assert_eq!(estimator.state(), FrameState::NoReference);
    }
}
