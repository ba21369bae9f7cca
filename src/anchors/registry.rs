//! Per-node anchor lifecycle state machine.
//!
//! Each node in the active floor snapshot has exactly one binding in exactly
//! one state: Unresolved, Resolving, or Resolved. All transitions go through
//! the methods here and are only ever applied by the session owner thread;
//! service callbacks never mutate bindings directly.

use std::collections::HashMap;
use std::time::Instant;

use crate::anchors::{AnchorService, HostRequest, HostUpdate, ResolveRequest, ResolveUpdate};
use crate::core::WorldPose;
use crate::graph::{FloorGraph, NodeId};

/// Resolution state of a node's anchor binding.
#[derive(Debug, Clone)]
pub enum BindingState {
    /// No resolve in flight; eligible for a future attempt.
    Unresolved,
    /// Exactly one service call outstanding.
    Resolving,
    /// Anchor recovered in the AR world frame.
    Resolved {
        /// Pose of the anchor in the AR world frame.
        pose: WorldPose,
        /// When the terminal success arrived.
        resolved_at: Instant,
    },
}

/// A node's anchor binding.
#[derive(Debug, Clone)]
pub struct AnchorBinding {
    /// Cloud anchor id; empty while unbound (hosting not yet completed).
    pub anchor_id: String,
    /// Current lifecycle state.
    pub state: BindingState,
    /// Local pose captured when a host request was issued.
    host_pose: Option<WorldPose>,
}

/// Emitted when a node transitions to Resolved, so the rendering layer can
/// instantiate a visual marker at the anchor.
#[derive(Debug, Clone)]
pub struct AnchorPlacement {
    pub node_id: NodeId,
    pub pose: WorldPose,
}

/// Result of reconciling bindings against a new node snapshot.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Nodes removed from the snapshot; their anchors were detached.
    pub removed: Vec<NodeId>,
    /// Nodes newly present, inserted as Unresolved.
    pub added: Vec<NodeId>,
}

/// Owned aggregate of all anchor bindings for the active floor.
///
/// Exposes only transition operations, never raw map access, so the
/// one-binding-one-state invariant holds by construction.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    bindings: HashMap<NodeId, AnchorBinding>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile bindings to exactly the node set of `graph`.
    ///
    /// Newly absent nodes are detached and removed; new nodes are inserted
    /// as Unresolved. The caller uses the returned `removed` set to
    /// invalidate the reference frame if it named one of them.
    pub fn sync_nodes(&mut self, graph: &FloorGraph) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        let current: HashMap<NodeId, &str> = graph
            .nodes
            .iter()
            .map(|n| (n.id, n.anchor_id.as_str()))
            .collect();

        self.bindings.retain(|id, _| {
            let keep = current.contains_key(id);
            if !keep {
                outcome.removed.push(*id);
            }
            keep
        });

        for (id, anchor_id) in &current {
            match self.bindings.get_mut(id) {
                Some(binding) => {
                    // Authoring tool may rebind a node to a new anchor;
                    // a changed id invalidates whatever was resolved.
                    if binding.anchor_id != *anchor_id {
                        binding.anchor_id = anchor_id.to_string();
                        binding.state = BindingState::Unresolved;
                    }
                }
                None => {
                    self.bindings.insert(
                        *id,
                        AnchorBinding {
                            anchor_id: anchor_id.to_string(),
                            state: BindingState::Unresolved,
                            host_pose: None,
                        },
                    );
                    outcome.added.push(*id);
                }
            }
        }

        outcome.removed.sort_unstable();
        outcome.added.sort_unstable();
        if !outcome.removed.is_empty() {
            log::debug!("detached {} stale anchor bindings", outcome.removed.len());
        }
        outcome
    }

    /// Request resolution of a node's anchor.
    ///
    /// No-op unless the binding exists, carries an anchor id, and is
    /// Unresolved. On success the binding moves to Resolving and exactly one
    /// service call is issued; repeated requests while Resolving are
    /// absorbed here, which is what makes concurrent callers observe a
    /// single outstanding call.
    pub fn request_resolution(&mut self, node_id: NodeId, service: &dyn AnchorService) -> bool {
        let Some(binding) = self.bindings.get_mut(&node_id) else {
            return false;
        };
        if binding.anchor_id.is_empty() {
            return false;
        }
        if !matches!(binding.state, BindingState::Unresolved) {
            return false;
        }

        binding.state = BindingState::Resolving;
        log::debug!("resolving anchor for node {node_id}");
        service.resolve(ResolveRequest {
            node_id,
            anchor_id: binding.anchor_id.clone(),
        });
        true
    }

    /// Apply a resolve update delivered through the owner's event channel.
    ///
    /// Returns a placement event when the node transitions to Resolved.
    /// Updates for nodes no longer in the registry are dropped as no-ops.
    pub fn apply_resolution(
        &mut self,
        node_id: NodeId,
        update: ResolveUpdate,
    ) -> Option<AnchorPlacement> {
        let Some(binding) = self.bindings.get_mut(&node_id) else {
            log::debug!("dropping resolve update for unknown node {node_id}");
            return None;
        };
        if !matches!(binding.state, BindingState::Resolving) {
            log::debug!("dropping resolve update for node {node_id} (not resolving)");
            return None;
        }

        match update {
            ResolveUpdate::InProgress => None,
            ResolveUpdate::Success(pose) => {
                binding.state = BindingState::Resolved {
                    pose,
                    resolved_at: Instant::now(),
                };
                log::info!("anchor resolved for node {node_id}");
                Some(AnchorPlacement { node_id, pose })
            }
            ResolveUpdate::Error(kind) => {
                // Absorbed: large graphs routinely see transient per-anchor
                // failures. The node becomes eligible again on a later tick.
                log::warn!("anchor resolution failed for node {node_id}: {kind}");
                binding.state = BindingState::Unresolved;
                None
            }
        }
    }

    /// Request hosting of a new anchor for an unbound node (author time).
    ///
    /// No-op unless the binding exists, has no anchor id, and is Unresolved.
    pub fn request_hosting(
        &mut self,
        node_id: NodeId,
        local_pose: WorldPose,
        ttl_days: u32,
        service: &dyn AnchorService,
    ) -> bool {
        let Some(binding) = self.bindings.get_mut(&node_id) else {
            return false;
        };
        if !binding.anchor_id.is_empty() || !matches!(binding.state, BindingState::Unresolved) {
            return false;
        }

        binding.state = BindingState::Resolving;
        binding.host_pose = Some(local_pose);
        log::debug!("hosting anchor for node {node_id}");
        service.host(HostRequest {
            node_id,
            local_pose,
            ttl_days,
        });
        true
    }

    /// Apply a host update delivered through the owner's event channel.
    ///
    /// On terminal success the binding adopts the new cloud anchor id and is
    /// immediately Resolved at the pose it was hosted from; the returned id
    /// is for the (out-of-scope) persistence layer to store on the node.
    pub fn apply_hosting(&mut self, node_id: NodeId, update: HostUpdate) -> Option<String> {
        let Some(binding) = self.bindings.get_mut(&node_id) else {
            log::debug!("dropping host update for unknown node {node_id}");
            return None;
        };
        if !matches!(binding.state, BindingState::Resolving) {
            return None;
        }

        match update {
            HostUpdate::InProgress => None,
            HostUpdate::Success(anchor_id) => {
                let pose = binding.host_pose.take().unwrap_or_default();
                binding.anchor_id = anchor_id.clone();
                binding.state = BindingState::Resolved {
                    pose,
                    resolved_at: Instant::now(),
                };
                log::info!("anchor hosted for node {node_id}");
                Some(anchor_id)
            }
            HostUpdate::Error(kind) => {
                log::warn!("anchor hosting failed for node {node_id}: {kind}");
                binding.host_pose = None;
                binding.state = BindingState::Unresolved;
                None
            }
        }
    }

    /// Current state of a node's binding.
    pub fn state(&self, node_id: NodeId) -> Option<&BindingState> {
        self.bindings.get(&node_id).map(|b| &b.state)
    }

    /// World pose of a node's anchor, if Resolved.
    pub fn resolved_pose(&self, node_id: NodeId) -> Option<&WorldPose> {
        match self.bindings.get(&node_id).map(|b| &b.state) {
            Some(BindingState::Resolved { pose, .. }) => Some(pose),
            _ => None,
        }
    }

    /// Whether the node's anchor is Resolved.
    pub fn is_resolved(&self, node_id: NodeId) -> bool {
        matches!(
            self.bindings.get(&node_id).map(|b| &b.state),
            Some(BindingState::Resolved { .. })
        )
    }

    /// Whether the node is Resolved or has a resolve in flight
    /// (the scheduler skips both).
    pub fn is_settled_or_pending(&self, node_id: NodeId) -> bool {
        matches!(
            self.bindings.get(&node_id).map(|b| &b.state),
            Some(BindingState::Resolved { .. }) | Some(BindingState::Resolving)
        )
    }

    /// Ids of all Resolved bindings, sorted.
    pub fn resolved_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .bindings
            .iter()
            .filter(|(_, b)| matches!(b.state, BindingState::Resolved { .. }))
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of bindings the scheduler must skip (Resolved or Resolving).
    pub fn settled_or_pending_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .bindings
            .iter()
            .filter(|(_, b)| {
                matches!(
                    b.state,
                    BindingState::Resolved { .. } | BindingState::Resolving
                )
            })
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
