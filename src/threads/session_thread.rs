//! Session owner thread.
//!
//! The one logical writer for the AnchorRegistry and the
//! ReferenceFrameEstimator. Everything that wants to mutate them (graph
//! updates, anchor-service callbacks, scheduler admissions, route outcomes)
//! arrives here over channels and is applied serially inside the loop.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::anchors::{AnchorEvent, AnchorRegistry, AnchorService};
use crate::config::MargaConfig;
use crate::core::PlanPoint;
use crate::error::{NavError, Result};
use crate::graph::{FloorGraph, NodeId};
use crate::localization::ReferenceFrameEstimator;
use crate::scheduler::{PoseMailbox, SchedulerView};
use crate::session::{
    CommandReceiver, CommandResponse, CommandResult, LocalizationStatus, SessionCommand,
    SessionEvent, SharedStateHandle,
};
use crate::threads::routing_thread::{RouteOutcome, RouteRequest};

/// A pose older than this is treated as tracking lost.
const POSE_MAX_AGE: Duration = Duration::from_millis(500);

/// Channels wiring the owner to the other threads and to the outside.
pub struct SessionChannels {
    /// Commands from the embedding application.
    pub commands_rx: CommandReceiver,
    /// Anchor service callbacks, marshaled from arbitrary threads.
    pub anchor_rx: crossbeam_channel::Receiver<AnchorEvent>,
    /// Admissions from the scheduler tick thread.
    pub admissions_rx: crossbeam_channel::Receiver<Vec<NodeId>>,
    /// Route queries to the routing worker.
    pub route_requests_tx: crossbeam_channel::Sender<RouteRequest>,
    /// Finished route queries from the routing worker.
    pub route_outcomes_rx: crossbeam_channel::Receiver<RouteOutcome>,
    /// Events for the rendering layer.
    pub events_tx: crossbeam_channel::Sender<SessionEvent>,
}

/// Session owner thread handle.
pub struct SessionThread {
    handle: JoinHandle<()>,
}

impl SessionThread {
    /// Spawn the owner thread.
    pub fn spawn(
        config: MargaConfig,
        service: Arc<dyn AnchorService>,
        mailbox: Arc<PoseMailbox>,
        shared: SharedStateHandle,
        channels: SessionChannels,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("nav-session".into())
            .spawn(move || {
                let mut owner = SessionOwner {
                    estimator: ReferenceFrameEstimator::new(config.frame.scale_factor),
                    config,
                    service,
                    mailbox,
                    shared,
                    channels,
                    running,
                    graph: Arc::new(FloorGraph::default()),
                    registry: AnchorRegistry::new(),
                    destination: None,
                    route_generation: 0,
                    route_pending: false,
                    active_route_nodes: Vec::new(),
                    last_position_publish: Instant::now(),
                };
                owner.run();
            })
            .map_err(|e| NavError::SessionUnavailable(format!("session thread: {e}")))?;

        Ok(Self { handle })
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

struct SessionOwner {
    config: MargaConfig,
    service: Arc<dyn AnchorService>,
    mailbox: Arc<PoseMailbox>,
    shared: SharedStateHandle,
    channels: SessionChannels,
    running: Arc<AtomicBool>,

    graph: Arc<FloorGraph>,
    registry: AnchorRegistry,
    estimator: ReferenceFrameEstimator,

    /// Active routing destination, if any.
    destination: Option<NodeId>,
    /// Monotonic route query counter; outcomes from older generations are
    /// dropped (last request wins).
    route_generation: u64,
    /// The active route was computed from the floorplan origin because no
    /// live position existed yet; recompute as soon as one does.
    route_pending: bool,
    /// Node ids of the active route, for scheduler prioritization.
    active_route_nodes: Vec<NodeId>,

    last_position_publish: Instant,
}

impl SessionOwner {
    fn run(&mut self) {
        let loop_interval = Duration::from_millis(self.config.session.loop_interval_ms);
        log::info!(
            "session thread running every {}ms",
            loop_interval.as_millis()
        );

        while self.running.load(Ordering::Relaxed) {
            let loop_start = Instant::now();

            self.drain_commands();
            self.drain_anchor_events();
            self.drain_admissions();
            self.update_localization();
            self.drain_route_outcomes();
            self.publish_shared();

            let elapsed = loop_start.elapsed();
            if elapsed < loop_interval {
                thread::sleep(loop_interval - elapsed);
            }
        }

        // Session over: stop consuming the pose stream. Anchor callbacks
        // still in flight land in a channel nobody reads and are dropped.
        self.mailbox.clear();
        log::info!("session thread stopped");
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.channels.commands_rx.try_recv() {
            let stop = matches!(cmd.command, SessionCommand::EndSession);
            let result = self.execute_command(cmd.command);
            cmd.response_tx.send(result).ok();
            if stop {
                return;
            }
        }
    }

    fn execute_command(&mut self, command: SessionCommand) -> CommandResult {
        match command {
            SessionCommand::UpdateGraph(graph) => {
                if *self.graph == graph {
                    return Ok(CommandResponse::GraphUnchanged);
                }
                self.apply_graph(graph);
                Ok(CommandResponse::GraphUpdated)
            }

            SessionCommand::SetDestination(node_id) => {
                if self.graph.node(node_id).is_none() {
                    return Err(format!("unknown destination node {node_id}"));
                }
                self.destination = Some(node_id);
                self.request_route();
                Ok(CommandResponse::DestinationSet)
            }

            SessionCommand::CancelRoute => {
                self.destination = None;
                self.route_pending = false;
                self.active_route_nodes.clear();
                if let Ok(mut state) = self.shared.write() {
                    state.active_route = None;
                    state.route_error = None;
                }
                Ok(CommandResponse::RouteCancelled)
            }

            SessionCommand::HostAnchor {
                node_id,
                local_pose,
            } => {
                let started = self.registry.request_hosting(
                    node_id,
                    local_pose,
                    self.config.hosting.anchor_ttl_days,
                    self.service.as_ref(),
                );
                if started {
                    Ok(CommandResponse::HostingStarted)
                } else {
                    Err(format!("node {node_id} not eligible for hosting"))
                }
            }

            SessionCommand::EndSession => {
                self.running.store(false, Ordering::Relaxed);
                Ok(CommandResponse::SessionEnded)
            }
        }
    }

    fn apply_graph(&mut self, graph: FloorGraph) {
        log::info!(
            "graph snapshot updated: {} nodes, {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );
        self.graph = Arc::new(graph);

        let outcome = self.registry.sync_nodes(&self.graph);
        self.estimator.invalidate_nodes(&outcome.removed);
        for node_id in outcome.removed {
            self.emit(SessionEvent::AnchorDetached(node_id));
        }

        match self.destination {
            Some(dest) if self.graph.node(dest).is_some() => {
                // Same destination, new graph: recompute.
                self.request_route();
            }
            Some(_) => {
                // Destination no longer exists.
                self.destination = None;
                self.route_pending = false;
                self.active_route_nodes.clear();
                if let Ok(mut state) = self.shared.write() {
                    state.active_route = None;
                    state.route_error = None;
                }
            }
            None => {}
        }
    }

    /// Issue a route query for the current destination.
    ///
    /// Before localization there is no live position; the query runs from
    /// the floorplan origin instead so the scheduler gets route anchors to
    /// bootstrap from, and is reissued once a real position exists.
    fn request_route(&mut self) {
        let Some(destination) = self.destination else {
            return;
        };
        let live = match self.current_plan_position() {
            Some(p) => {
                self.route_pending = false;
                p
            }
            None => {
                self.route_pending = true;
                PlanPoint::new(0.0, 0.0)
            }
        };

        self.route_generation += 1;
        let request = RouteRequest {
            generation: self.route_generation,
            live,
            destination,
            graph: Arc::clone(&self.graph),
        };
        if self.channels.route_requests_tx.send(request).is_err() {
            log::warn!("routing thread unavailable");
        }
    }

    fn drain_anchor_events(&mut self) {
        while let Ok(event) = self.channels.anchor_rx.try_recv() {
            match event {
                AnchorEvent::Resolution { node_id, update } => {
                    if let Some(placement) = self.registry.apply_resolution(node_id, update) {
                        self.emit(SessionEvent::AnchorPlaced(placement));
                    }
                }
                AnchorEvent::Hosting { node_id, update } => {
                    if let Some(anchor_id) = self.registry.apply_hosting(node_id, update) {
                        self.emit(SessionEvent::AnchorHosted { node_id, anchor_id });
                    }
                }
            }
        }
    }

    fn drain_admissions(&mut self) {
        while let Ok(batch) = self.channels.admissions_rx.try_recv() {
            for node_id in batch {
                self.registry
                    .request_resolution(node_id, self.service.as_ref());
            }
        }
    }

    fn update_localization(&mut self) {
        let pose = self.mailbox.latest(POSE_MAX_AGE);

        // Resolved anchors count as tracked while the pose stream is live;
        // with tracking lost nothing is tracked and the frame goes stale on
        // its own terms (reference stays, conversions pause).
        let tracked = if pose.is_some() {
            self.registry.resolved_ids()
        } else {
            Vec::new()
        };
        self.estimator
            .observe(&tracked, &self.graph, &self.registry);

        let position_interval = Duration::from_millis(self.config.session.position_interval_ms);
        if self.last_position_publish.elapsed() >= position_interval {
            self.last_position_publish = Instant::now();

            let plan = pose.as_ref().and_then(|p| {
                self.estimator
                    .map_coordinate_from_pose(p, &self.graph, &self.registry)
            });
            match plan {
                Some(point) => {
                    if let Ok(mut state) = self.shared.write() {
                        state.you_are_here = Some(point);
                        state.status = LocalizationStatus::Localized;
                    }
                    self.emit(SessionEvent::YouAreHere(point));
                }
                None => {
                    if let Ok(mut state) = self.shared.write() {
                        state.you_are_here = None;
                        state.status = LocalizationStatus::Localizing;
                    }
                    self.emit(SessionEvent::Localizing);
                }
            }
        }

        if self.route_pending && self.current_plan_position().is_some() {
            self.request_route();
        }
    }

    fn drain_route_outcomes(&mut self) {
        while let Ok(outcome) = self.channels.route_outcomes_rx.try_recv() {
            if outcome.generation != self.route_generation {
                log::debug!(
                    "dropping stale route result (generation {} < {})",
                    outcome.generation,
                    self.route_generation
                );
                continue;
            }

            match outcome.result {
                Ok(route) => {
                    self.active_route_nodes = route.nodes.clone();
                    if let Ok(mut state) = self.shared.write() {
                        state.active_route = Some(route.clone());
                        state.route_error = None;
                    }
                    self.emit(SessionEvent::RouteReady(route));
                }
                Err(e) => {
                    // Never leave a stale overlay behind a failed query.
                    self.active_route_nodes.clear();
                    if let Ok(mut state) = self.shared.write() {
                        state.active_route = None;
                        state.route_error = Some(e.clone());
                    }
                    self.emit(SessionEvent::RouteFailed(e));
                }
            }
        }
    }

    /// Publish the frame state and the scheduler's working view.
    fn publish_shared(&mut self) {
        let frame = self.estimator.estimate(&self.graph, &self.registry);
        let skip: HashSet<NodeId> = self.registry.settled_or_pending_ids().into_iter().collect();

        if let Ok(mut state) = self.shared.write() {
            state.frame = self.estimator.state();
            state.resolved_anchors = self.registry.resolved_ids().len();
            state.scheduler_view = SchedulerView {
                graph: Arc::clone(&self.graph),
                route: self.active_route_nodes.clone(),
                skip,
                frame,
            };
        }
    }

    fn current_plan_position(&self) -> Option<PlanPoint> {
        let pose = self.mailbox.latest(POSE_MAX_AGE)?;
        self.estimator
            .map_coordinate_from_pose(&pose, &self.graph, &self.registry)
    }

    fn emit(&self, event: SessionEvent) {
        self.channels.events_tx.send(event).ok();
    }
}
