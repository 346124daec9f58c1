use super::runner::RunReport;
use super::{export, summary};
use crate::error::{AppError, AppResult};
use crate::metrics::{
    Aggregates, MetricsStore, RunVerdict, SampleBatch, ThresholdSpec, names,
};
use crate::scheduler::{RunStats, WorkerStats};
use std::future::Future;
use std::time::Duration;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::metrics(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn sample_report(thresholds: &[ThresholdSpec]) -> (RunReport, Aggregates) {
    let mut batch = SampleBatch::new();
    batch.count(names::ITERATIONS);
    batch.count(names::ITERATIONS);
    for _ in 0..4 {
        batch.count(names::HTTP_REQS);
    }
    batch.rate(names::HTTP_REQ_FAILED, false);
    batch.rate(names::HTTP_REQ_FAILED, false);
    batch.rate(names::HTTP_REQ_FAILED, false);
    batch.rate(names::HTTP_REQ_FAILED, true);
    batch.trend(names::PROCESSING_LATENCY, 1_000);
    batch.trend(names::PROCESSING_LATENCY, 3_000);
    batch.trend(names::HTTP_REQ_DURATION, 40);
    batch.count(names::VIDEOS_PROCESSED);
    batch.count(names::VIDEOS_PROCESSED);

    let store = MetricsStore::new();
    store.commit(batch);
    let samples = store.snapshot();
    let aggregates = Aggregates::from_samples(&samples);
    let report = RunReport {
        verdict: RunVerdict::evaluate(thresholds, &aggregates),
        samples,
        stats: RunStats {
            workers: vec![
                WorkerStats {
                    worker_index: 0,
                    iterations: 1,
                    aborted_iterations: 1,
                    samples_committed: 3,
                },
                WorkerStats {
                    worker_index: 1,
                    iterations: 1,
                    aborted_iterations: 0,
                    samples_committed: 12,
                },
            ],
            elapsed: Duration::from_secs(60),
        },
        identities: 2,
        provisioning_failures: 1,
    };
    (report, aggregates)
}

#[test]
fn summary_reports_rates_and_counts() -> AppResult<()> {
    let thresholds = vec![ThresholdSpec::parse(names::HTTP_REQ_FAILED, "rate<0.5")?];
    let (report, aggregates) = sample_report(&thresholds);
    let lines = summary::summary_lines(&report, &aggregates)?;

    let expected = [
        "Duration: 60s",
        "Users: 2 (1 signup failures)",
        "Iterations: 2 (2.00/min, 1 aborted)",
        "HTTP Requests: 4 (25.00% failed)",
        "Videos Processed: 2",
        "Verdict: PASSED",
    ];
    for line in expected {
        if !lines.iter().any(|candidate| candidate == line) {
            return Err(AppError::metrics(format!(
                "Missing line '{}' in {:?}",
                line, lines
            )));
        }
    }
    Ok(())
}

#[test]
fn summary_marks_failed_and_missing_thresholds() -> AppResult<()> {
    let thresholds = vec![
        ThresholdSpec::parse(names::HTTP_REQ_FAILED, "rate<0.1")?,
        ThresholdSpec::parse(names::UPLOAD_DURATION, "p(95)<500")?,
    ];
    let (report, _) = sample_report(&thresholds);
    let lines = summary::threshold_lines(&report.verdict);

    if !lines.iter().any(|line| line.starts_with("  [FAIL] http_req_failed")) {
        return Err(AppError::metrics(format!("Expected FAIL line: {:?}", lines)));
    }
    if !lines
        .iter()
        .any(|line| line.starts_with("  [skip] upload_duration_ms") && line.ends_with("(observed no data)"))
    {
        return Err(AppError::metrics(format!("Expected skip line: {:?}", lines)));
    }
    if lines.last().map(String::as_str) != Some("Verdict: FAILED") {
        return Err(AppError::metrics(format!("Expected failed verdict: {:?}", lines)));
    }
    Ok(())
}

#[test]
fn summary_without_latency_samples_says_so() -> AppResult<()> {
    let store = MetricsStore::new();
    let aggregates = Aggregates::from_samples(&store.snapshot());
    let report = RunReport {
        verdict: RunVerdict::evaluate(&[], &aggregates),
        samples: Vec::new(),
        stats: RunStats {
            workers: Vec::new(),
            elapsed: Duration::ZERO,
        },
        identities: 1,
        provisioning_failures: 0,
    };
    let lines = summary::summary_lines(&report, &aggregates)?;
    if !lines.iter().any(|line| line == "Processing Latency: no samples") {
        return Err(AppError::metrics(format!("Expected empty latency line: {:?}", lines)));
    }
    Ok(())
}

#[test]
fn csv_export_writes_header_and_rows() -> AppResult<()> {
    run_async_test(async {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("samples.csv");
        let path_str = path.to_string_lossy().into_owned();
        let (report, _) = sample_report(&[]);

        export::export_csv(&path_str, &report.samples).await?;

        let content = tokio::fs::read_to_string(&path).await?;
        let mut lines = content.lines();
        if lines.next() != Some("timestamp_ms,metric,kind,value") {
            return Err(AppError::metrics(format!("Unexpected header: {}", content)));
        }
        let rows = lines.count();
        if rows != report.samples.len() {
            return Err(AppError::metrics(format!(
                "Expected {} rows, got {}",
                report.samples.len(),
                rows
            )));
        }
        if !content.contains(",processing_latency_ms,trend,3000") {
            return Err(AppError::metrics(format!("Missing latency row: {}", content)));
        }
        Ok(())
    })
}

#[test]
fn json_export_carries_verdict_and_histograms() -> AppResult<()> {
    run_async_test(async {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report.json");
        let path_str = path.to_string_lossy().into_owned();
        let thresholds = vec![ThresholdSpec::parse(names::HTTP_REQ_FAILED, "rate<0.5")?];
        let (report, aggregates) = sample_report(&thresholds);

        export::export_json(&path_str, &report, &aggregates).await?;

        let content = tokio::fs::read_to_string(&path).await?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        if value.pointer("/verdict/passed") != Some(&serde_json::Value::Bool(true)) {
            return Err(AppError::metrics(format!("Unexpected verdict: {}", content)));
        }
        if value.pointer("/verdict/counts/iterations").and_then(serde_json::Value::as_u64) != Some(2) {
            return Err(AppError::metrics(format!("Unexpected counts: {}", content)));
        }
        let latency = value
            .pointer("/latency/processing_latency_ms")
            .ok_or_else(|| AppError::metrics("Missing processing latency"))?;
        if latency.get("count").and_then(serde_json::Value::as_u64) != Some(2) {
            return Err(AppError::metrics(format!("Unexpected latency: {}", latency)));
        }
        if latency
            .get("histogram_b64")
            .and_then(serde_json::Value::as_str)
            .is_none_or(str::is_empty)
        {
            return Err(AppError::metrics("Missing encoded histogram"));
        }
        let samples = value
            .get("samples")
            .and_then(serde_json::Value::as_array)
            .map_or(0, Vec::len);
        if samples != report.samples.len() {
            return Err(AppError::metrics(format!(
                "Expected {} samples, got {}",
                report.samples.len(),
                samples
            )));
        }
        Ok(())
    })
}
