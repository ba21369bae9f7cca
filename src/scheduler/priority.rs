//! Priority computation for anchor resolution.
//!
//! Runs once per scheduler tick, off the pose-producing thread, against a
//! detached [`SchedulerView`] the owner publishes. Its only output is a list
//! of node ids to request; the owner consumes the list and performs the
//! registry transitions, preserving the single-writer discipline.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::WorldPose;
use crate::graph::{FloorGraph, NodeId};
use crate::localization::FrameEstimate;

/// Read-only state the priority pass works from.
///
/// Published by the session owner each loop; everything here is detached
/// from the owner's mutable aggregates so the pass can run on any thread.
#[derive(Debug, Clone, Default)]
pub struct SchedulerView {
    /// Current floor snapshot.
    pub graph: Arc<FloorGraph>,
    /// Nodes on the active route, in walking order.
    pub route: Vec<NodeId>,
    /// Nodes already Resolved or Resolving; never admitted.
    pub skip: HashSet<NodeId>,
    /// Current frame estimate, if localization has a reference.
    pub frame: Option<FrameEstimate>,
}

/// Nodes to request resolution for in this tick.
///
/// Candidate order is route nodes first (in route order), then all other
/// anchored nodes by ascending id. A candidate is admitted when the planar
/// squared distance from the sampled pose to its predicted world position is
/// under the applicable threshold; route nodes get the larger threshold.
/// While no reference frame exists, route nodes are admitted unconditionally
/// so the first resolutions can bootstrap localization. Admission stops at
/// the batch cap.
pub fn compute_admissions(
    pose: &WorldPose,
    view: &SchedulerView,
    config: &SchedulerConfig,
) -> Vec<NodeId> {
    let mut admitted = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();

    let mut others: Vec<NodeId> = view
        .graph
        .nodes
        .iter()
        .filter(|n| !view.route.contains(&n.id))
        .map(|n| n.id)
        .collect();
    others.sort_unstable();

    let candidates = view.route.iter().chain(others.iter());

    for &node_id in candidates {
        if admitted.len() >= config.batch_cap {
            break;
        }
        if !seen.insert(node_id) {
            continue;
        }
        if view.skip.contains(&node_id) {
            continue;
        }
        let Some(node) = view.graph.node(node_id) else {
            continue;
        };
        if !node.has_anchor() {
            continue;
        }

        let on_route = view.route.contains(&node_id);

        match &view.frame {
            Some(frame) => {
                let predicted = frame.predict_world(node.position());
                let dist_sq = predicted.planar_distance_squared(&pose.position);
                let threshold = if on_route {
                    config.route_threshold_sq
                } else {
                    config.other_threshold_sq
                };
                if dist_sq < threshold {
                    admitted.push(node_id);
                }
            }
            None => {
                // Bootstrap: nothing can be predicted until something
                // resolves, and route anchors are the ones worth the quota.
                if on_route {
                    admitted.push(node_id);
                }
            }
        }
    }

    admitted
}
