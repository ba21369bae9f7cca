//! Scheduler tick thread.
//!
//! Samples the newest pose from the mailbox at a fixed low cadence, runs the
//! priority pass against the owner's published view, and emits admissions.
//! It never touches the registry: its only output is node ids on a channel
//! the owner drains.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::SchedulerConfig;
use crate::error::{NavError, Result};
use crate::graph::NodeId;
use crate::scheduler::{compute_admissions, PoseMailbox};
use crate::session::SharedStateHandle;

/// Scheduler thread handle.
pub struct SchedulerThread {
    handle: JoinHandle<()>,
}

impl SchedulerThread {
    /// Spawn the scheduler tick thread.
    pub fn spawn(
        config: SchedulerConfig,
        mailbox: Arc<PoseMailbox>,
        shared: SharedStateHandle,
        admissions_tx: crossbeam_channel::Sender<Vec<NodeId>>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("anchor-scheduler".into())
            .spawn(move || {
                run_scheduler_loop(config, mailbox, shared, admissions_tx, running);
            })
            .map_err(|e| NavError::SessionUnavailable(format!("scheduler thread: {e}")))?;

        Ok(Self { handle })
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_scheduler_loop(
    config: SchedulerConfig,
    mailbox: Arc<PoseMailbox>,
    shared: SharedStateHandle,
    admissions_tx: crossbeam_channel::Sender<Vec<NodeId>>,
    running: Arc<AtomicBool>,
) {
    let tick_interval = Duration::from_millis(config.tick_interval_ms);
    log::info!(
        "scheduler thread running every {}ms",
        tick_interval.as_millis()
    );

    while running.load(Ordering::Relaxed) {
        let tick_start = Instant::now();

        // A pose older than one tick means tracking is lost; no admissions.
        if let Some(pose) = mailbox.latest(tick_interval) {
            let view = match shared.read() {
                Ok(state) => state.scheduler_view.clone(),
                Err(_) => break, // owner panicked; nothing sane to do
            };

            let admitted = compute_admissions(&pose, &view, &config);
            if !admitted.is_empty() {
                log::debug!("admitting {} resolution candidates", admitted.len());
                if admissions_tx.send(admitted).is_err() {
                    break; // owner gone
                }
            }
        }

        let elapsed = tick_start.elapsed();
        if elapsed < tick_interval {
            thread::sleep(tick_interval - elapsed);
        }
    }

    log::info!("scheduler thread stopped");
}
