//! Data structures describing task and batch outcomes

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::app::host::WrittenAsset;
use crate::app::queue::DownloadTask;

/// Permanent failure of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskError {
    pub task_id: String,
    pub item_key: String,
    pub target_key: String,
    pub source: String,
    pub message: String,
    pub attempts: u32,
}

impl TaskError {
    pub fn new(task: &DownloadTask, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            task_id: task.id.clone(),
            item_key: task.item_key.clone(),
            target_key: task.target_key.clone(),
            source: task.source_url().to_string(),
            message: message.into(),
            attempts,
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (after {} attempt{})",
            self.target_key,
            self.message,
            self.attempts,
            if self.attempts == 1 { "" } else { "s" }
        )
    }
}

/// How one task ended
#[derive(Debug)]
pub enum TaskOutcome {
    Succeeded(WrittenAsset),
    Failed(TaskError),
    /// Stopped between attempts because the run was cancelled
    Interrupted,
}

/// Totals of one scheduler run
///
/// Individual task failures never abort the batch; they are counted and
/// listed here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub errors: Vec<TaskError>,
    /// Tasks dropped from the queue or discarded after cancellation
    pub skipped: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
