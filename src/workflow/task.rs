use tokio::time::Instant;

use crate::client::{VideoId, VideoStatus};

/// One accepted upload followed until it reaches a terminal status.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub video_id: VideoId,
    pub task_id: Option<String>,
    pub submitted_at: Instant,
    pub last_known_status: VideoStatus,
    pub terminal: bool,
    /// When the terminal status was first observed.
    pub finished_at: Option<Instant>,
}

impl UploadTask {
    #[must_use]
    pub const fn new(video_id: VideoId, task_id: Option<String>, submitted_at: Instant) -> Self {
        Self {
            video_id,
            task_id,
            submitted_at,
            last_known_status: VideoStatus::Uploaded,
            terminal: false,
            finished_at: None,
        }
    }

    /// Applies a reported status. Backward moves and reports after a
    /// terminal status are ignored; returns whether the status changed.
    pub fn advance(&mut self, reported: VideoStatus, observed_at: Instant) -> bool {
        if self.terminal || reported.rank() < self.last_known_status.rank() {
            return false;
        }
        let changed = reported != self.last_known_status;
        self.last_known_status = reported;
        if reported.is_terminal() {
            self.terminal = true;
            self.finished_at = Some(observed_at);
        }
        changed
    }
}

/// How a polled task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Processed { latency_ms: u64 },
    Failed,
    TimedOut,
}
