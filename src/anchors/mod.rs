//! Anchor cloud service boundary.
//!
//! The persisted-anchor cloud is an external collaborator. Resolve and host
//! calls are fire-and-forget from the caller's point of view; the service
//! implementation delivers streamed updates into the session owner's event
//! channel from whatever thread the platform invokes its callbacks on. The
//! owner loop is the only place those updates touch registry state.

pub mod registry;

pub use registry::{AnchorBinding, AnchorPlacement, AnchorRegistry, BindingState, SyncOutcome};

use crate::core::WorldPose;
use crate::error::AnchorFailure;
use crate::graph::NodeId;

/// Streamed update for a resolve operation.
#[derive(Debug, Clone)]
pub enum ResolveUpdate {
    /// Cloud is still searching; not a state change.
    InProgress,
    /// Anchor recovered; pose is in the AR world frame.
    Success(WorldPose),
    /// Terminal failure.
    Error(AnchorFailure),
}

/// Streamed update for a host operation.
#[derive(Debug, Clone)]
pub enum HostUpdate {
    /// Upload still in progress; not a state change.
    InProgress,
    /// Anchor persisted; carries the new cloud anchor id.
    Success(String),
    /// Terminal failure.
    Error(AnchorFailure),
}

/// A resolve request handed to the anchor service.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Node whose binding is being resolved.
    pub node_id: NodeId,
    /// Persisted cloud anchor id.
    pub anchor_id: String,
}

/// A host request handed to the anchor service.
#[derive(Debug, Clone)]
pub struct HostRequest {
    /// Node the new anchor will be bound to.
    pub node_id: NodeId,
    /// Pose of the locally placed anchor in the AR world frame.
    pub local_pose: WorldPose,
    /// Requested time-to-live in days.
    pub ttl_days: u32,
}

/// Events delivered from service callback threads to the session owner.
#[derive(Debug, Clone)]
pub enum AnchorEvent {
    /// Update for an outstanding resolve.
    Resolution {
        node_id: NodeId,
        update: ResolveUpdate,
    },
    /// Update for an outstanding host.
    Hosting { node_id: NodeId, update: HostUpdate },
}

/// Async anchor cloud operations.
///
/// Implementations must not block the caller; results arrive later as
/// [`AnchorEvent`]s on the channel the implementation was constructed with.
pub trait AnchorService: Send + Sync {
    /// Begin resolving a persisted anchor.
    fn resolve(&self, request: ResolveRequest);

    /// Begin hosting a locally placed anchor.
    fn host(&self, request: HostRequest);
}
