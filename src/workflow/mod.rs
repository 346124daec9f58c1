//! Per-iteration workflow: login, uploads, status polling, reads.
mod iteration;
mod poller;
mod task;

#[cfg(test)]
mod tests;

use tokio::time::Instant;

use crate::metrics::{SampleBatch, names};

pub use iteration::{
    IterationContext, IterationOutcome, WorkerContext, WorkflowPlan, execute_iteration,
    run_iteration,
};
pub use poller::{PollReport, PollSettings, poll_until_terminal};
pub use task::{TaskOutcome, UploadTask};

/// Request count, duration and failure flag for one HTTP call.
fn record_request(batch: &mut SampleBatch, started: Instant, success: bool) {
    batch.count(names::HTTP_REQS);
    batch.trend_elapsed(names::HTTP_REQ_DURATION, started.elapsed());
    batch.rate(names::HTTP_REQ_FAILED, !success);
}
