use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::args::WorkflowKind;
use crate::client::{
    MY_VIDEOS_PATH, PUBLIC_VIDEOS_PATH, RANKINGS_PATH, VideoPayload, VoteOutcome,
    WorkflowClient, listed_video_id,
};
use crate::fixtures::{IdentityPool, TestIdentity};
use crate::metrics::{MetricsStore, SampleBatch, names};

use super::poller::{PollSettings, poll_until_terminal};
use super::record_request;
use super::task::{TaskOutcome, UploadTask};

/// What every iteration of a run does.
#[derive(Debug, Clone)]
pub struct WorkflowPlan {
    pub kind: WorkflowKind,
    pub batch_size: usize,
    pub poll: PollSettings,
    pub dwell: Duration,
    pub vote: bool,
    pub payload: VideoPayload,
}

/// Shared handles a worker needs; cloned once per worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub client: Arc<dyn WorkflowClient>,
    pub pool: IdentityPool,
    pub store: Arc<MetricsStore>,
    pub plan: Arc<WorkflowPlan>,
}

/// State owned by one iteration after a successful login.
#[derive(Debug)]
pub struct IterationContext<'a> {
    pub identity: &'a TestIdentity,
    pub auth_token: String,
    pub started_at: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationOutcome {
    /// Login failed, nothing else ran.
    pub aborted: bool,
    pub uploads_accepted: usize,
    pub upload_failures: usize,
    pub processed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub polls: u64,
    pub read_failures: usize,
    pub samples_committed: usize,
}

/// Runs one workflow for `worker_index`, commits its samples, then dwells.
///
/// Request failures are counted, never returned.
pub async fn run_iteration(
    ctx: &WorkerContext,
    worker_index: usize,
    iteration: u64,
) -> IterationOutcome {
    let outcome = execute_iteration(ctx, worker_index, iteration).await;
    if !ctx.plan.dwell.is_zero() {
        tokio::time::sleep(ctx.plan.dwell).await;
    }
    outcome
}

/// The workflow and commit without the dwell. Dropping the future before it
/// completes discards the iteration's samples.
pub async fn execute_iteration(
    ctx: &WorkerContext,
    worker_index: usize,
    iteration: u64,
) -> IterationOutcome {
    let started_at = Instant::now();
    let mut batch = SampleBatch::new();
    let mut outcome = IterationOutcome::default();

    if let Some(iteration_ctx) = login(ctx, worker_index, started_at, &mut batch).await {
        let plan = ctx.plan.as_ref();
        if plan.kind.uploads() {
            upload_and_poll(ctx, &iteration_ctx, worker_index, iteration, &mut batch, &mut outcome)
                .await;
        }
        if plan.kind.browses() {
            browse(ctx, &iteration_ctx, worker_index, &mut batch, &mut outcome).await;
        }
    } else {
        outcome.aborted = true;
    }

    batch.count(names::ITERATIONS);
    batch.trend_elapsed(names::ITERATION_DURATION, started_at.elapsed());
    outcome.samples_committed = ctx.store.commit(batch);
    outcome
}

async fn login<'a>(
    ctx: &'a WorkerContext,
    worker_index: usize,
    started_at: Instant,
    batch: &mut SampleBatch,
) -> Option<IterationContext<'a>> {
    let Some(identity) = ctx.pool.get(worker_index) else {
        warn!("VU {} has no identity to log in with.", worker_index);
        batch.count(names::AUTH_FAILURES);
        return None;
    };

    let request_started = Instant::now();
    let result = ctx.client.login(identity).await;
    record_request(batch, request_started, result.is_ok());
    match result {
        Ok(auth_token) => Some(IterationContext {
            identity,
            auth_token,
            started_at,
        }),
        Err(err) => {
            batch.count(names::AUTH_FAILURES);
            warn!("VU {} login as {} failed: {}", worker_index, identity.email, err);
            None
        }
    }
}

async fn upload_and_poll(
    ctx: &WorkerContext,
    iteration_ctx: &IterationContext<'_>,
    worker_index: usize,
    iteration: u64,
    batch: &mut SampleBatch,
    outcome: &mut IterationOutcome,
) {
    let plan = ctx.plan.as_ref();
    let mut tasks = Vec::with_capacity(plan.batch_size);

    for slot in 0..plan.batch_size {
        let title = format!("Load Test VU{} #{}-{}", worker_index, iteration, slot);
        let request_started = Instant::now();
        let result = ctx
            .client
            .upload_video(&iteration_ctx.auth_token, &title, &plan.payload)
            .await;
        record_request(batch, request_started, result.is_ok());
        match result {
            Ok(receipt) => {
                batch.trend_elapsed(names::UPLOAD_DURATION, request_started.elapsed());
                debug!(
                    "VU {} uploaded '{}' as video {}.",
                    worker_index, title, receipt.video_id
                );
                tasks.push(UploadTask::new(
                    receipt.video_id,
                    receipt.task_id,
                    Instant::now(),
                ));
            }
            Err(err) => {
                batch.count(names::UPLOAD_FAILURES);
                batch.rate(names::TASK_FAILED, true);
                outcome.upload_failures = outcome.upload_failures.saturating_add(1);
                warn!("VU {} upload '{}' failed: {}", worker_index, title, err);
            }
        }
    }
    outcome.uploads_accepted = tasks.len();

    let report = poll_until_terminal(
        ctx.client.as_ref(),
        &iteration_ctx.auth_token,
        &mut tasks,
        plan.poll,
        batch,
    )
    .await;
    outcome.polls = report.polls;

    for (task, task_outcome) in tasks.iter().zip(report.outcomes) {
        match task_outcome {
            TaskOutcome::Processed { latency_ms } => {
                batch.trend(names::PROCESSING_LATENCY, latency_ms);
                batch.count(names::VIDEOS_PROCESSED);
                batch.rate(names::TASK_FAILED, false);
                outcome.processed = outcome.processed.saturating_add(1);
            }
            TaskOutcome::Failed => {
                batch.count(names::PROCESSING_FAILURES);
                batch.rate(names::TASK_FAILED, true);
                outcome.failed = outcome.failed.saturating_add(1);
                warn!("VU {}: video {} failed processing.", worker_index, task.video_id);
            }
            TaskOutcome::TimedOut => {
                batch.count(names::POLL_TIMEOUTS);
                outcome.timed_out = outcome.timed_out.saturating_add(1);
                warn!(
                    "VU {}: video {} still {} after {} polls.",
                    worker_index, task.video_id, task.last_known_status, report.ticks
                );
            }
        }
    }
}

async fn browse(
    ctx: &WorkerContext,
    iteration_ctx: &IterationContext<'_>,
    worker_index: usize,
    batch: &mut SampleBatch,
    outcome: &mut IterationOutcome,
) {
    let token = iteration_ctx.auth_token.as_str();
    let mut public_videos = Vec::new();

    for (path, auth) in [
        (MY_VIDEOS_PATH, Some(token)),
        (PUBLIC_VIDEOS_PATH, None),
        (RANKINGS_PATH, None),
    ] {
        let request_started = Instant::now();
        let result = ctx.client.list_resources(auth, path).await;
        record_request(batch, request_started, result.is_ok());
        match result {
            Ok(items) => {
                debug!("VU {} listed {} items from {}.", worker_index, items.len(), path);
                if path == PUBLIC_VIDEOS_PATH {
                    public_videos = items;
                }
            }
            Err(err) => {
                batch.count(names::READ_FAILURES);
                outcome.read_failures = outcome.read_failures.saturating_add(1);
                warn!("VU {} read of {} failed: {}", worker_index, path, err);
            }
        }
    }

    if !ctx.plan.vote {
        return;
    }
    let Some(video_id) = public_videos.iter().find_map(listed_video_id) else {
        debug!("VU {} found no public video to vote for.", worker_index);
        return;
    };
    let request_started = Instant::now();
    let result = ctx.client.vote(token, &video_id).await;
    record_request(batch, request_started, result.is_ok());
    match result {
        Ok(VoteOutcome::Registered) => batch.count(names::VOTES),
        Ok(VoteOutcome::AlreadyVoted) => {
            debug!("VU {} already voted for video {}.", worker_index, video_id);
        }
        Err(err) => warn!("VU {} vote for video {} failed: {}", worker_index, video_id, err),
    }
}
