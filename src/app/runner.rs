use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::args::{PositiveU64, RunArgs};
use crate::client::{ClientSettings, HttpWorkflowClient, VideoPayload, WorkflowClient};
use crate::error::{AppError, AppResult, ValidationError};
use crate::fixtures::{ProvisionReport, ProvisionSettings, existing_identity, provision};
use crate::metrics::{
    Aggregates, MetricSample, MetricsStore, RunVerdict, default_thresholds, merge_thresholds,
};
use crate::scheduler::{RunStats, SchedulerSettings, run_workers};
use crate::shutdown::{ShutdownReceiver, ShutdownSender};
use crate::workflow::{PollSettings, WorkerContext, WorkflowPlan};

use super::{export, summary};

pub(crate) struct RunReport {
    pub verdict: RunVerdict,
    pub samples: Vec<MetricSample>,
    pub stats: RunStats,
    pub identities: usize,
    pub provisioning_failures: usize,
}

/// Provisions identities, runs the load phase, and evaluates thresholds.
pub(crate) async fn run_load_test(
    args: &RunArgs,
    shutdown_tx: &ShutdownSender,
) -> AppResult<RunReport> {
    let mut setup_rx = shutdown_tx.subscribe();
    let base_url = args
        .base_url
        .clone()
        .ok_or_else(|| AppError::validation(ValidationError::MissingBaseUrl))?;
    let client = HttpWorkflowClient::new(&ClientSettings {
        base_url,
        request_timeout: args.request_timeout,
        connect_timeout: args.connect_timeout,
    })?;
    let client: Arc<dyn WorkflowClient> = Arc::new(client);
    let payload = VideoPayload::load(args.video_file.as_deref().map(Path::new)).await?;
    let thresholds = merge_thresholds(
        default_thresholds(args.latency_threshold, args.error_rate_threshold),
        &args.thresholds,
    );

    let fixtures = provision_identities(client.as_ref(), args, &mut setup_rx).await?;
    let identities = fixtures.pool.len();
    let ctx = WorkerContext {
        client,
        pool: fixtures.pool,
        store: Arc::new(MetricsStore::new()),
        plan: Arc::new(WorkflowPlan {
            kind: args.workflow,
            batch_size: args.batch_size.get(),
            poll: PollSettings {
                interval: args.poll_interval,
                max_attempts: args.max_poll_attempts.get(),
            },
            dwell: args.dwell,
            vote: args.vote,
            payload,
        }),
    };

    let stats = run_workers(
        &ctx,
        SchedulerSettings {
            vus: args.vus.get(),
            duration: args.duration,
            iterations: args.iterations.map(PositiveU64::get),
        },
        shutdown_tx,
        setup_rx,
    )
    .await?;
    info!(
        "Load test completed with {} users ({} iterations).",
        identities,
        stats.total_iterations()
    );

    let samples = ctx.store.snapshot();
    let aggregates = Aggregates::from_samples(&samples);
    let verdict = RunVerdict::evaluate(&thresholds, &aggregates);
    for failed in verdict.failed() {
        warn!(
            "Threshold {} {} failed (observed {}).",
            failed.metric,
            failed.expression,
            failed.observed_display()
        );
    }

    let report = RunReport {
        verdict,
        samples,
        stats,
        identities,
        provisioning_failures: fixtures.failures,
    };
    summary::print_summary(&report, &aggregates)?;
    write_exports(args, &report, &aggregates).await?;
    Ok(report)
}

async fn provision_identities(
    client: &dyn WorkflowClient,
    args: &RunArgs,
    setup_rx: &mut ShutdownReceiver,
) -> AppResult<ProvisionReport> {
    if let (Some(email), Some(password)) = (args.user_email.as_deref(), args.user_password.as_deref())
    {
        return Ok(existing_identity(email, password));
    }

    let settings = ProvisionSettings {
        count: args.identity_target(),
        password: args.signup_password.clone(),
        delay: args.setup_delay,
    };
    info!("Provisioning {} test users.", settings.count);
    Ok(provision(client, &settings, setup_rx).await?)
}

async fn write_exports(args: &RunArgs, report: &RunReport, aggregates: &Aggregates) -> AppResult<()> {
    if let Some(path) = args.export_json.as_deref() {
        export::export_json(path, report, aggregates).await?;
        info!("Wrote JSON export to {}.", path);
    }
    if let Some(path) = args.export_csv.as_deref() {
        export::export_csv(path, &report.samples).await?;
        info!("Wrote CSV export to {}.", path);
    }
    Ok(())
}
