//! Session state and inter-thread messaging.
//!
//! One thread (the session owner) owns the AR session, the AnchorRegistry,
//! and the ReferenceFrameEstimator; every mutation of those goes through its
//! command loop. This module defines the command channel (with response
//! acknowledgment), the event stream consumed by the rendering layer, and
//! the shared snapshot other threads read.

use std::sync::{mpsc, Arc, RwLock};
use std::time::Duration;

use crate::anchors::AnchorPlacement;
use crate::core::{PlanPoint, WorldPose};
use crate::graph::{FloorGraph, NodeId};
use crate::localization::FrameState;
use crate::routing::{RouteResult, RoutingError};
use crate::scheduler::SchedulerView;

/// Commands sent to the session owner thread.
#[derive(Debug)]
pub enum SessionCommand {
    /// Replace the floor snapshot (graph store pushed an update).
    UpdateGraph(FloorGraph),

    /// Route from the live position to this node. Supersedes any in-flight
    /// query; results for earlier destinations are dropped.
    SetDestination(NodeId),

    /// Drop the active route and destination.
    CancelRoute,

    /// Host a new cloud anchor for an unbound node (author time).
    HostAnchor {
        node_id: NodeId,
        local_pose: WorldPose,
    },

    /// Stop the session. Late anchor callbacks become no-ops.
    EndSession,
}

/// Response data from command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    /// Snapshot replaced and bindings reconciled.
    GraphUpdated,
    /// Snapshot was value-equal to the current one; nothing recomputed.
    GraphUnchanged,
    /// Destination accepted; route query issued or queued until localized.
    DestinationSet,
    /// Route and destination cleared.
    RouteCancelled,
    /// Host call issued to the anchor service.
    HostingStarted,
    /// Session shut down.
    SessionEnded,
}

/// Result of a command execution.
pub type CommandResult = Result<CommandResponse, String>;

/// Command with response channel for acknowledgment.
pub struct CommandWithResponse {
    /// The command to execute.
    pub command: SessionCommand,
    /// Channel to send the response back.
    pub response_tx: mpsc::Sender<CommandResult>,
}

impl std::fmt::Debug for CommandWithResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandWithResponse")
            .field("command", &self.command)
            .field("response_tx", &"...")
            .finish()
    }
}

/// Sender end of the command channel.
pub type CommandSender = mpsc::Sender<CommandWithResponse>;

/// Receiver end of the command channel (held by the owner thread).
pub type CommandReceiver = mpsc::Receiver<CommandWithResponse>;

/// Create a new command channel pair.
pub fn create_command_channel() -> (CommandSender, CommandReceiver) {
    mpsc::channel()
}

/// Send a command and wait for acknowledgment.
pub fn send_command_sync(
    sender: &CommandSender,
    command: SessionCommand,
    timeout_ms: u64,
) -> CommandResult {
    let (response_tx, response_rx) = mpsc::channel();

    sender
        .send(CommandWithResponse {
            command,
            response_tx,
        })
        .map_err(|_| "session thread not responding (channel closed)".to_string())?;

    response_rx
        .recv_timeout(Duration::from_millis(timeout_ms))
        .map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => "session command timeout".to_string(),
            mpsc::RecvTimeoutError::Disconnected => "session thread disconnected".to_string(),
        })?
}

/// Events produced for the rendering layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Throttled "you are here" floorplan coordinate.
    YouAreHere(PlanPoint),

    /// Localization not possible yet (tracking lost or no reference frame).
    /// Expected steady state during warm-up; render as "localizing…".
    Localizing,

    /// A node's anchor resolved; place a visual marker at this world pose.
    AnchorPlaced(AnchorPlacement),

    /// A node left the snapshot; remove its marker.
    AnchorDetached(NodeId),

    /// A hosted anchor was persisted; the graph store should record the id.
    AnchorHosted { node_id: NodeId, anchor_id: String },

    /// A route query finished.
    RouteReady(RouteResult),

    /// A route query found no route; any overlay must be cleared, never
    /// left stale.
    RouteFailed(RoutingError),
}

/// Localization status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalizationStatus {
    /// Not enough resolved anchors, or tracking lost.
    #[default]
    Localizing,
    /// Position available.
    Localized,
}

/// Cross-thread snapshot of session state.
///
/// Written only by the owner thread; the scheduler thread and outside
/// readers take read locks.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Current localization status.
    pub status: LocalizationStatus,

    /// Current reference-frame state.
    pub frame: FrameState,

    /// Latest published user position on the floorplan.
    pub you_are_here: Option<PlanPoint>,

    /// Active route overlay, if any.
    pub active_route: Option<RouteResult>,

    /// Error from the most recent failed route query; cleared on success
    /// or cancel.
    pub route_error: Option<RoutingError>,

    /// Number of currently resolved anchors.
    pub resolved_anchors: usize,

    /// Detached view the scheduler's priority pass works from.
    pub scheduler_view: SchedulerView,
}

/// Handle type for shared state.
pub type SharedStateHandle = Arc<RwLock<SharedState>>;

/// Create a new shared state wrapped in Arc<RwLock>.
pub fn create_shared_state() -> SharedStateHandle {
    Arc::new(RwLock::new(SharedState::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_command_roundtrip() {
        let (tx, rx) = create_command_channel();

        let handle = thread::spawn(move || {
            let cmd = rx.recv().unwrap();
            assert!(matches!(cmd.command, SessionCommand::CancelRoute));
            cmd.response_tx
                .send(Ok(CommandResponse::RouteCancelled))
                .unwrap();
        });

        let result = send_command_sync(&tx, SessionCommand::CancelRoute, 1000);
        assert_eq!(result.unwrap(), CommandResponse::RouteCancelled);
        handle.join().unwrap();
    }

    #[test]
    fn test_command_to_dead_thread_fails() {
        let (tx, rx) = create_command_channel();
        drop(rx);
        let result = send_command_sync(&tx, SessionCommand::CancelRoute, 100);
        assert!(result.is_err());
    }

    #[test]
    fn test_shared_state_defaults() {
        let shared = create_shared_state();
        let state = shared.read().unwrap();
        assert_eq!(state.status, LocalizationStatus::Localizing);
        assert!(state.active_route.is_none());
    }
}
