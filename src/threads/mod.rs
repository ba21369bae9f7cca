//! Thread management for the navigation session.
//!
//! Three threads cooperate: the session owner (single writer for registry
//! and frame state), the anchor scheduler tick, and the routing worker.
//! `NavSession` spawns them, wires the channels, and is the embedding
//! application's handle for the lifetime of a visit.

pub mod routing_thread;
pub mod scheduler_thread;
pub mod session_thread;

pub use routing_thread::{RouteOutcome, RouteRequest, RoutingThread};
pub use scheduler_thread::SchedulerThread;
pub use session_thread::{SessionChannels, SessionThread};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::anchors::{AnchorEvent, AnchorService};
use crate::config::MargaConfig;
use crate::core::WorldPose;
use crate::error::Result;
use crate::scheduler::PoseMailbox;
use crate::session::{
    create_command_channel, create_shared_state, send_command_sync, CommandResult, CommandSender,
    SessionCommand, SessionEvent, SharedStateHandle,
};

/// Default acknowledgment timeout for session commands.
const COMMAND_TIMEOUT_MS: u64 = 2000;

/// A running navigation session.
///
/// Owns the worker threads and the inbound side of every channel. The
/// AR layer calls [`publish_pose`](NavSession::publish_pose) every tracking
/// frame; everything else goes through [`send_command`](NavSession::send_command).
pub struct NavSession {
    commands_tx: CommandSender,
    mailbox: Arc<PoseMailbox>,
    shared: SharedStateHandle,
    running: Arc<AtomicBool>,
    session: SessionThread,
    scheduler: SchedulerThread,
    routing: RoutingThread,
}

impl NavSession {
    /// Spawn the session threads.
    ///
    /// `anchor_rx` is the receiving half the platform adapter pushes
    /// [`AnchorEvent`]s into from the anchor service's callback threads.
    /// Returns the session handle and the event stream for the rendering
    /// layer.
    pub fn start(
        config: MargaConfig,
        service: Arc<dyn AnchorService>,
        anchor_rx: crossbeam_channel::Receiver<AnchorEvent>,
    ) -> Result<(Self, crossbeam_channel::Receiver<SessionEvent>)> {
        let mailbox = Arc::new(PoseMailbox::new());
        let shared = create_shared_state();
        let running = Arc::new(AtomicBool::new(true));

        let (commands_tx, commands_rx) = create_command_channel();
        let (admissions_tx, admissions_rx) = crossbeam_channel::unbounded();
        let (route_requests_tx, route_requests_rx) = crossbeam_channel::unbounded();
        let (route_outcomes_tx, route_outcomes_rx) = crossbeam_channel::unbounded();
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        let routing = RoutingThread::spawn(route_requests_rx, route_outcomes_tx)?;
        let scheduler = SchedulerThread::spawn(
            config.scheduler.clone(),
            Arc::clone(&mailbox),
            Arc::clone(&shared),
            admissions_tx,
            Arc::clone(&running),
        )?;
        let session = SessionThread::spawn(
            config,
            service,
            Arc::clone(&mailbox),
            Arc::clone(&shared),
            SessionChannels {
                commands_rx,
                anchor_rx,
                admissions_rx,
                route_requests_tx,
                route_outcomes_rx,
                events_tx,
            },
            Arc::clone(&running),
        )?;

        log::info!("navigation session started");

        Ok((
            Self {
                commands_tx,
                mailbox,
                shared,
                running,
                session,
                scheduler,
                routing,
            },
            events_rx,
        ))
    }

    /// Publish a tracking pose. Called every AR frame; never blocks on the
    /// owner loop, and overwrites any pose the owner has not read yet.
    pub fn publish_pose(&self, pose: WorldPose) {
        if self.running.load(Ordering::Relaxed) {
            self.mailbox.publish(pose);
        }
    }

    /// Send a command to the owner thread and wait for acknowledgment.
    pub fn send_command(&self, command: SessionCommand) -> CommandResult {
        send_command_sync(&self.commands_tx, command, COMMAND_TIMEOUT_MS)
    }

    /// Handle for reading the shared session snapshot.
    pub fn shared_state(&self) -> SharedStateHandle {
        Arc::clone(&self.shared)
    }

    /// Whether the session threads are still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the session and join all threads.
    ///
    /// The owner drops its route-request sender on exit, which in turn
    /// stops the routing worker.
    pub fn shutdown(self) -> thread::Result<()> {
        // Best effort: EndSession responds before the owner loop exits, but
        // a dead owner is fine too; the flag covers the scheduler either way.
        self.send_command(SessionCommand::EndSession).ok();
        self.running.store(false, Ordering::Relaxed);

        self.session.join()?;
        self.scheduler.join()?;
        self.routing.join()?;
        log::info!("navigation session shut down");
        Ok(())
    }
}
