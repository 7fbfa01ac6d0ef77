//! Pause, resume and cancellation of a run
//!
//! A [`RunControl`] is cloned into every scheduler of a run. Control is
//! cooperative: schedulers consult it before dequeuing a task and retry loops
//! consult it before another attempt. In-flight transfers are never
//! interrupted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Control state shared by every worker of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Paused,
    Cancelled,
}

/// Shared handle over the current [`RunState`]
#[derive(Debug, Clone)]
pub struct RunControl {
    tx: Arc<watch::Sender<RunState>>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunState::Running);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> RunState {
        *self.tx.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == RunState::Cancelled
    }

    pub fn is_paused(&self) -> bool {
        self.state() == RunState::Paused
    }

    /// Stop dequeuing new tasks; returns false if the run was not running
    pub fn pause(&self) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if *state == RunState::Running {
                *state = RunState::Paused;
                true
            } else {
                false
            }
        });
        if changed {
            info!("Run paused");
        }
        changed
    }

    /// Continue a paused run; returns false if it was not paused
    pub fn resume(&self) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if *state == RunState::Paused {
                *state = RunState::Running;
                true
            } else {
                false
            }
        });
        if changed {
            info!("Run resumed");
        }
        changed
    }

    /// Drop pending work; terminal until [`RunControl::reset`]
    pub fn cancel(&self) {
        let previous = self.tx.send_replace(RunState::Cancelled);
        if previous != RunState::Cancelled {
            info!("Run cancelled");
        }
    }

    /// Prepare for a new run
    pub fn reset(&self) {
        self.tx.send_replace(RunState::Running);
    }

    /// Wait while paused; true when running, false when cancelled
    pub async fn wait_until_runnable(&self) -> bool {
        let mut rx = self.tx.subscribe();
        let runnable = match rx.wait_for(|state| *state != RunState::Paused).await {
            Ok(state) => *state == RunState::Running,
            Err(_) => false,
        };
        runnable
    }

    /// Resolve once the run is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|state| *state == RunState::Cancelled).await;
    }
}
