//! Progress throttling

use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters reported by a running batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Target key of the most recently finished task
    pub current_asset: Option<String>,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Finished tasks, successful or not
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    pub fn is_done(&self) -> bool {
        self.finished() >= self.total
    }
}

/// Limits emissions to one per interval; forced emissions always pass
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether to emit now; records the emission when it returns true
    pub fn should_emit(&mut self, force: bool) -> bool {
        let now = Instant::now();
        let due = match self.last {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if force || due {
            self.last = Some(now);
            true
        } else {
            false
        }
    }
}
