//! Virtual-user workers driving iterations until the run ends.

use futures_util::future::join_all;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::shutdown::{ShutdownReceiver, ShutdownSender};
use crate::shutdown_handlers::setup_duration_shutdown;
use crate::workflow::{WorkerContext, execute_iteration};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub vus: usize,
    pub duration: Duration,
    /// Per-VU iteration cap; the run still ends at `duration`.
    pub iterations: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_index: usize,
    pub iterations: u64,
    pub aborted_iterations: u64,
    pub samples_committed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub workers: Vec<WorkerStats>,
    pub elapsed: Duration,
}

impl RunStats {
    #[must_use]
    pub fn total_iterations(&self) -> u64 {
        self.workers
            .iter()
            .fold(0u64, |total, worker| total.saturating_add(worker.iterations))
    }

    #[must_use]
    pub fn total_aborted(&self) -> u64 {
        self.workers
            .iter()
            .fold(0u64, |total, worker| total.saturating_add(worker.aborted_iterations))
    }

    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.workers
            .iter()
            .fold(0usize, |total, worker| {
                total.saturating_add(worker.samples_committed)
            })
    }
}

/// Runs `vus` workers with stable indices until the duration elapses,
/// shutdown is broadcast, or every worker reaches its iteration cap.
///
/// `setup_rx` must be subscribed before setup began; a shutdown it already
/// holds means no worker is started.
///
/// # Errors
///
/// Returns an error if a worker task panics or is cancelled.
pub async fn run_workers(
    ctx: &WorkerContext,
    settings: SchedulerSettings,
    shutdown_tx: &ShutdownSender,
    mut setup_rx: ShutdownReceiver,
) -> AppResult<RunStats> {
    let started = Instant::now();
    let receivers: Vec<ShutdownReceiver> =
        (0..settings.vus).map(|_| shutdown_tx.subscribe()).collect();
    if !matches!(setup_rx.try_recv(), Err(TryRecvError::Empty)) {
        info!("Shutdown requested before the load phase; no VUs started.");
        return Ok(RunStats::default());
    }

    let timer = setup_duration_shutdown(shutdown_tx, settings.duration);
    info!(
        "Starting {} VUs for {:?}{}.",
        settings.vus,
        settings.duration,
        settings
            .iterations
            .map(|limit| format!(" (max {} iterations each)", limit))
            .unwrap_or_default()
    );

    let handles: Vec<_> = receivers
        .into_iter()
        .enumerate()
        .map(|(worker_index, shutdown_rx)| {
            let ctx = ctx.clone();
            tokio::spawn(run_worker(ctx, worker_index, settings.iterations, shutdown_rx))
        })
        .collect();

    let mut workers = Vec::with_capacity(handles.len());
    for result in join_all(handles).await {
        workers.push(result.map_err(AppError::from)?);
    }

    // Stops the timer when workers finished on their iteration cap.
    drop(shutdown_tx.send(()));
    timer.await?;

    let stats = RunStats {
        workers,
        elapsed: started.elapsed(),
    };
    info!(
        "{} VUs finished {} iterations in {:?}.",
        settings.vus,
        stats.total_iterations(),
        stats.elapsed
    );
    Ok(stats)
}

async fn run_worker(
    ctx: WorkerContext,
    worker_index: usize,
    iteration_limit: Option<u64>,
    mut shutdown_rx: ShutdownReceiver,
) -> WorkerStats {
    let mut stats = WorkerStats {
        worker_index,
        ..WorkerStats::default()
    };

    loop {
        if iteration_limit.is_some_and(|limit| stats.iterations >= limit) {
            debug!("VU {} reached its iteration limit.", worker_index);
            break;
        }
        let outcome = tokio::select! {
            _ = shutdown_rx.recv() => break,
            outcome = execute_iteration(&ctx, worker_index, stats.iterations) => outcome,
        };
        stats.iterations = stats.iterations.saturating_add(1);
        stats.samples_committed = stats
            .samples_committed
            .saturating_add(outcome.samples_committed);
        if outcome.aborted {
            stats.aborted_iterations = stats.aborted_iterations.saturating_add(1);
        }

        let dwell = ctx.plan.dwell;
        if dwell.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                () = tokio::time::sleep(dwell) => {}
            }
        }
    }

    debug!(
        "VU {} stopped after {} iterations.",
        worker_index, stats.iterations
    );
    stats
}
