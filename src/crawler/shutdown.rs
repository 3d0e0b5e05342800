//! Interrupt handling for a crawl run.
//!
//! The signal listener only flips the phase; the controller observes the
//! change and performs the drain itself.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Exit status used when a second interrupt forces the process down
pub const FORCED_EXIT_CODE: i32 = 130;

/// Lifecycle of a crawl with respect to interruption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    /// Interrupt received; the frontier is being persisted
    Draining,
    Terminated,
}

/// Cloneable handle over the shared shutdown phase
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    phase: Arc<watch::Sender<ShutdownPhase>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(ShutdownPhase::Running);
        Self {
            phase: Arc::new(phase),
        }
    }

    /// Current phase
    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.borrow()
    }

    /// Move from `Running` to `Draining`. Returns false if already past `Running`.
    pub fn request(&self) -> bool {
        self.phase.send_if_modified(|phase| {
            if *phase == ShutdownPhase::Running {
                *phase = ShutdownPhase::Draining;
                true
            } else {
                false
            }
        })
    }

    /// Mark the drain as finished
    pub fn terminate(&self) {
        self.phase.send_replace(ShutdownPhase::Terminated);
    }

    /// Resolve once a shutdown has been requested
    pub async fn requested(&self) {
        let mut rx = self.phase.subscribe();
        loop {
            let phase = *rx.borrow_and_update();
            if phase != ShutdownPhase::Running {
                return;
            }

            // The sender lives in `self`, so the channel cannot close while we wait
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Spawn the Ctrl+C listener.
    ///
    /// The first interrupt requests a drain. A second one while draining exits
    /// the process immediately.
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let handle = self.clone();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("Unable to listen for Ctrl+C, interrupts will not be checkpointed");
                return;
            }

            info!("Received Ctrl+C, saving pending URLs before exit");
            info!("Press Ctrl+C again to force quit");
            handle.request();

            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Force quit requested, pending URLs may not have been saved");
                std::process::exit(FORCED_EXIT_CODE);
            }
        })
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}
