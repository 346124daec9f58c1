use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::client::{VideoStatus, WorkflowClient};
use crate::metrics::{SampleBatch, duration_ms, names};

use super::record_request;
use super::task::{TaskOutcome, UploadTask};

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    /// Ticks shared by the whole batch.
    pub max_attempts: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PollReport {
    /// One entry per task, in task order.
    pub outcomes: Vec<TaskOutcome>,
    pub ticks: u64,
    pub polls: u64,
}

/// Polls every non-terminal task once per tick until all are terminal or
/// the tick budget is spent. The first tick runs immediately; no sleep
/// follows the last one.
pub async fn poll_until_terminal(
    client: &dyn WorkflowClient,
    token: &str,
    tasks: &mut [UploadTask],
    settings: PollSettings,
    batch: &mut SampleBatch,
) -> PollReport {
    let mut report = PollReport::default();
    if tasks.is_empty() {
        return report;
    }

    while report.ticks < settings.max_attempts {
        if report.ticks > 0 {
            tokio::time::sleep(settings.interval).await;
        }
        report.ticks = report.ticks.saturating_add(1);

        for task in tasks.iter_mut().filter(|task| !task.terminal) {
            let started = Instant::now();
            let result = client.get_video_status(token, &task.video_id).await;
            report.polls = report.polls.saturating_add(1);
            record_request(batch, started, result.is_ok());
            match result {
                Ok(status) => {
                    if task.advance(status, Instant::now()) {
                        debug!(
                            "Video {} is {} (tick {}).",
                            task.video_id, status, report.ticks
                        );
                    }
                }
                Err(err) => {
                    batch.count(names::POLL_MISSES);
                    debug!("Poll of video {} failed: {}", task.video_id, err);
                }
            }
        }

        if tasks.iter().all(|task| task.terminal) {
            break;
        }
    }

    report.outcomes = tasks.iter().map(outcome_of).collect();
    report
}

fn outcome_of(task: &UploadTask) -> TaskOutcome {
    if !task.terminal {
        return TaskOutcome::TimedOut;
    }
    match task.last_known_status {
        VideoStatus::Processed => TaskOutcome::Processed {
            latency_ms: task.finished_at.map_or(0, |finished_at| {
                duration_ms(finished_at.saturating_duration_since(task.submitted_at))
            }),
        },
        VideoStatus::Failed => TaskOutcome::Failed,
        VideoStatus::Uploaded | VideoStatus::Processing => TaskOutcome::TimedOut,
    }
}
