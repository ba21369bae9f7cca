//! MargaNav - Indoor wayfinding on cloud-anchored venue graphs
//!
//! Localizes a visitor on a 2D floorplan by resolving cloud anchors bound to
//! graph nodes, estimates the rigid transform between the AR world frame and
//! the floorplan frame, and routes from the live position to a destination
//! node over the venue graph.
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    threads/                         │  ← Orchestration
//! │        (session owner, scheduler, routing)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    session/                         │  ← Messaging
//! │        (commands, events, shared snapshot)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │      anchors/    localization/    routing/          │  ← Core algorithms
//! │                  scheduler/                         │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     graph/                          │  ← Venue model
//! │                (nodes, edges, floors)               │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Flow of a visit
//!
//! 1. The embedding app pushes the floor's [`FloorGraph`] snapshot and starts
//!    feeding tracking poses through [`NavSession::publish_pose`].
//! 2. The scheduler admits nearby anchor-bearing nodes for resolution; the
//!    platform adapter forwards anchor-service callbacks as [`AnchorEvent`]s.
//! 3. Once an anchor resolves, the [`ReferenceFrameEstimator`] pins a
//!    reference and starts mapping poses to floorplan coordinates; a second
//!    resolved anchor upgrades the frame with a rotation estimate.
//! 4. Setting a destination runs Dijkstra on the routing worker and the
//!    route overlay arrives as a [`SessionEvent::RouteReady`].

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Venue model (depends on core)
// ============================================================================
pub mod graph;

// ============================================================================
// Layer 3: Algorithms (depends on core, graph)
// ============================================================================
pub mod anchors;
pub mod localization;
pub mod routing;
pub mod scheduler;

// ============================================================================
// Layer 4: Session messaging (depends on all lower layers)
// ============================================================================
pub mod session;

// ============================================================================
// Layer 5: Thread orchestration (depends on everything)
// ============================================================================
pub mod threads;

// ============================================================================
// Ambient concerns
// ============================================================================
pub mod config;
pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::math;
pub use crate::core::{PlanPoint, WorldPoint, WorldPose, WorldQuat};

// Venue model
pub use graph::{Edge, EdgeId, FloorGraph, Node, NodeId, NodeKind};

// Anchors
pub use anchors::{
    AnchorBinding, AnchorEvent, AnchorPlacement, AnchorRegistry, AnchorService, BindingState,
    HostRequest, HostUpdate, ResolveRequest, ResolveUpdate, SyncOutcome,
};

// Localization
pub use localization::{FrameEstimate, FrameState, ReferenceFrameEstimator};

// Routing
pub use routing::{PathfindingEngine, RouteResult, RoutingError};

// Scheduler
pub use scheduler::{compute_admissions, PoseMailbox, SchedulerView};

// Session messaging
pub use session::{
    create_command_channel, create_shared_state, send_command_sync, CommandResponse, CommandResult,
    CommandSender, CommandWithResponse, LocalizationStatus, SessionCommand, SessionEvent,
    SharedState, SharedStateHandle,
};

// Threads
pub use threads::NavSession;

// Configuration and errors
pub use config::MargaConfig;
pub use error::{AnchorFailure, NavError, Result};
