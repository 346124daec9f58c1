use super::*;
use crate::args::WorkflowKind;
use crate::client::scripted::ScriptedClient;
use crate::client::{VideoId, VideoPayload, VideoStatus};
use crate::error::{AppError, AppResult};
use crate::fixtures::{IdentityPool, TestIdentity};
use crate::metrics::{Aggregates, MetricsStore, names};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|err| AppError::metrics(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn plan(kind: WorkflowKind, batch_size: usize, interval: Duration, max_attempts: u64) -> WorkflowPlan {
    WorkflowPlan {
        kind,
        batch_size,
        poll: PollSettings {
            interval,
            max_attempts,
        },
        dwell: Duration::ZERO,
        vote: false,
        payload: VideoPayload::dummy(),
    }
}

fn context(client: &Arc<ScriptedClient>, plan: WorkflowPlan) -> WorkerContext {
    WorkerContext {
        client: client.clone(),
        pool: IdentityPool::new(vec![TestIdentity::new("loadtest_0@example.com", "pw")]),
        store: Arc::new(MetricsStore::new()),
        plan: Arc::new(plan),
    }
}

fn aggregates(ctx: &WorkerContext) -> Aggregates {
    Aggregates::from_samples(&ctx.store.snapshot())
}

#[test]
fn processed_after_three_polls_yields_one_latency_sample() -> AppResult<()> {
    run_async_test(async {
        let client = Arc::new(ScriptedClient::new().statuses_for(
            "42",
            vec![
                Some(VideoStatus::Processing),
                Some(VideoStatus::Processing),
                Some(VideoStatus::Processed),
            ],
        ));
        let ctx = context(
            &client,
            plan(WorkflowKind::Upload, 1, Duration::from_millis(12_500), 60),
        );

        let outcome = run_iteration(&ctx, 0, 0).await;
        let totals = aggregates(&ctx);

        let checks = [
            (outcome.processed == 1, "processed"),
            (outcome.polls == 3, "three polls"),
            (
                totals.trend(names::PROCESSING_LATENCY) == [25_000],
                "latency of 25000ms",
            ),
            (totals.counter(names::VIDEOS_PROCESSED) == 1, "videos_processed"),
            (totals.counter(names::PROCESSING_FAILURES) == 0, "no failures"),
            (totals.counter(names::POLL_TIMEOUTS) == 0, "no timeouts"),
            (totals.counter(names::UPLOAD_FAILURES) == 0, "no upload failures"),
            (totals.counter(names::ITERATIONS) == 1, "one iteration"),
        ];
        for (ok, label) in checks {
            if !ok {
                return Err(AppError::metrics(format!(
                    "Check '{}' failed: {:?} {:?}",
                    label,
                    outcome,
                    totals.trend(names::PROCESSING_LATENCY)
                )));
            }
        }
        Ok(())
    })
}

#[test]
fn rejected_login_aborts_before_uploads() -> AppResult<()> {
    run_async_test(async {
        let client = Arc::new(ScriptedClient::new().rejecting_login());
        let ctx = context(&client, plan(WorkflowKind::Full, 3, Duration::from_secs(1), 5));

        let outcome = run_iteration(&ctx, 0, 0).await;
        let calls = client.calls();
        let totals = aggregates(&ctx);

        if outcome.aborted
            && calls.uploads.is_empty()
            && calls.total_polls() == 0
            && calls.lists.is_empty()
            && totals.counter(names::AUTH_FAILURES) == 1
            && totals.rate(names::HTTP_REQ_FAILED).map(|rate| rate.ppm()) == Some(1_000_000)
        {
            Ok(())
        } else {
            Err(AppError::metrics(format!(
                "Unexpected aborted iteration {:?} {:?}",
                outcome, calls
            )))
        }
    })
}

#[test]
fn never_terminal_task_times_out_without_trailing_sleep() -> AppResult<()> {
    run_async_test(async {
        let client = Arc::new(
            ScriptedClient::new().default_statuses(vec![Some(VideoStatus::Processing)]),
        );
        let ctx = context(&client, plan(WorkflowKind::Upload, 1, Duration::from_secs(1), 3));

        let started = tokio::time::Instant::now();
        let outcome = run_iteration(&ctx, 0, 0).await;
        let elapsed = started.elapsed();
        let totals = aggregates(&ctx);

        if outcome.timed_out == 1
            && outcome.polls == 3
            && elapsed == Duration::from_secs(2)
            && totals.trend(names::PROCESSING_LATENCY).is_empty()
            && totals.counter(names::POLL_TIMEOUTS) == 1
            && totals.counter(names::PROCESSING_FAILURES) == 0
            && totals.rate(names::TASK_FAILED).is_none()
        {
            Ok(())
        } else {
            Err(AppError::metrics(format!(
                "Unexpected timeout iteration {:?} after {:?}",
                outcome, elapsed
            )))
        }
    })
}

#[test]
fn terminal_tasks_are_not_polled_again() -> AppResult<()> {
    run_async_test(async {
        let client = Arc::new(
            ScriptedClient::new()
                .statuses_for("42", vec![Some(VideoStatus::Processed)])
                .statuses_for(
                    "43",
                    vec![
                        Some(VideoStatus::Processing),
                        Some(VideoStatus::Processing),
                        Some(VideoStatus::Failed),
                    ],
                ),
        );
        let ctx = context(&client, plan(WorkflowKind::Upload, 2, Duration::from_secs(5), 10));

        let outcome = run_iteration(&ctx, 0, 0).await;
        let calls = client.calls();
        let totals = aggregates(&ctx);

        if calls.polls.get("42") == Some(&1)
            && calls.polls.get("43") == Some(&3)
            && outcome.processed == 1
            && outcome.failed == 1
            && totals.counter(names::PROCESSING_FAILURES) == 1
            && totals.rate(names::TASK_FAILED).map(|rate| rate.ppm()) == Some(500_000)
        {
            Ok(())
        } else {
            Err(AppError::metrics(format!(
                "Unexpected polling {:?} {:?}",
                calls.polls, outcome
            )))
        }
    })
}

#[test]
fn poll_miss_keeps_task_pollable() -> AppResult<()> {
    run_async_test(async {
        let client = Arc::new(
            ScriptedClient::new().statuses_for("42", vec![None, Some(VideoStatus::Processed)]),
        );
        let ctx = context(&client, plan(WorkflowKind::Upload, 1, Duration::from_secs(1), 5));

        let outcome = run_iteration(&ctx, 0, 0).await;
        let totals = aggregates(&ctx);

        if outcome.processed == 1
            && totals.counter(names::POLL_MISSES) == 1
            && totals.trend(names::PROCESSING_LATENCY) == [1_000]
        {
            Ok(())
        } else {
            Err(AppError::metrics(format!("Unexpected outcome {:?}", outcome)))
        }
    })
}

#[test]
fn failed_upload_is_excluded_from_polling() -> AppResult<()> {
    run_async_test(async {
        let client = Arc::new(
            ScriptedClient::new()
                .failing_uploads(&[0])
                .default_statuses(vec![Some(VideoStatus::Processed)]),
        );
        let ctx = context(&client, plan(WorkflowKind::Upload, 2, Duration::from_secs(1), 5));

        let outcome = run_iteration(&ctx, 3, 7).await;
        let calls = client.calls();
        let totals = aggregates(&ctx);

        if outcome.upload_failures == 1
            && outcome.uploads_accepted == 1
            && calls.total_polls() == 1
            && calls.uploads == vec!["Load Test VU3 #7-0", "Load Test VU3 #7-1"]
            && totals.counter(names::UPLOAD_FAILURES) == 1
            && totals.rate(names::TASK_FAILED).map(|rate| rate.ppm()) == Some(500_000)
        {
            Ok(())
        } else {
            Err(AppError::metrics(format!(
                "Unexpected upload handling {:?} {:?}",
                outcome, calls
            )))
        }
    })
}

#[test]
fn browse_reads_and_votes_once() -> AppResult<()> {
    run_async_test(async {
        let client = Arc::new(
            ScriptedClient::new().public_videos(vec![serde_json::json!({"ID": 9, "title": "x"})]),
        );
        let mut browse = plan(WorkflowKind::Browse, 1, Duration::from_secs(1), 5);
        browse.vote = true;
        let ctx = context(&client, browse);

        let first = run_iteration(&ctx, 0, 0).await;
        let second = run_iteration(&ctx, 0, 1).await;
        let calls = client.calls();
        let totals = aggregates(&ctx);

        if calls.uploads.is_empty()
            && calls.lists.len() == 6
            && calls.votes == vec!["9", "9"]
            && totals.counter(names::VOTES) == 1
            && first.read_failures == 0
            && second.read_failures == 0
        {
            Ok(())
        } else {
            Err(AppError::metrics(format!("Unexpected browse calls {:?}", calls)))
        }
    })
}

#[test]
fn samples_are_committed_before_dwell() -> AppResult<()> {
    run_async_test(async {
        let client = Arc::new(
            ScriptedClient::new().default_statuses(vec![Some(VideoStatus::Processed)]),
        );
        let mut dwelling = plan(WorkflowKind::Upload, 1, Duration::from_secs(1), 5);
        dwelling.dwell = Duration::from_secs(30);
        let ctx = context(&client, dwelling);

        let worker_ctx = ctx.clone();
        let handle = tokio::spawn(async move { run_iteration(&worker_ctx, 0, 0).await });
        tokio::time::sleep(Duration::from_secs(5)).await;

        let committed = ctx.store.len();
        let finished = handle.is_finished();
        handle.abort();
        if committed > 0 && !finished {
            Ok(())
        } else {
            Err(AppError::metrics(format!(
                "Expected committed samples while dwelling, got {} (finished={})",
                committed, finished
            )))
        }
    })
}

#[test]
fn status_never_moves_backwards() -> AppResult<()> {
    let now = tokio::time::Instant::now();
    let mut task = UploadTask::new(VideoId::new("1"), None, now);
    let steps = [
        (VideoStatus::Processing, true),
        (VideoStatus::Uploaded, false),
        (VideoStatus::Processing, false),
        (VideoStatus::Processed, true),
        (VideoStatus::Failed, false),
    ];
    for (status, expected_change) in steps {
        if task.advance(status, now) != expected_change {
            return Err(AppError::metrics(format!(
                "Unexpected change reporting {} at {}",
                status, task.last_known_status
            )));
        }
    }
    if task.terminal && task.last_known_status == VideoStatus::Processed {
        Ok(())
    } else {
        Err(AppError::metrics(format!("Unexpected final task {:?}", task)))
    }
}
