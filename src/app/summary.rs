use crate::error::AppResult;
use crate::metrics::{Aggregates, LatencyHistogram, RunVerdict, names};

use super::runner::RunReport;

/// Divisor for fixed-point x100 values.
const PERCENT_DIVISOR: u64 = 100;
/// Parts per million in one hundredth of a percent.
const PPM_PER_BASIS_POINT: u64 = 100;

pub(crate) struct SummaryStats {
    pub(crate) http_failure_rate_x100: u64,
    pub(crate) task_failure_rate_x100: u64,
    pub(crate) iterations_per_min_x100: u64,
}

pub(crate) struct LatencyLine {
    pub(crate) count: u64,
    pub(crate) p50: u64,
    pub(crate) p90: u64,
    pub(crate) p99: u64,
    pub(crate) max: u64,
}

impl LatencyLine {
    pub(crate) fn from_values(values: &[u64]) -> AppResult<Self> {
        let histogram = LatencyHistogram::from_values(values)?;
        let (p50, p90, p99) = histogram.percentiles();
        Ok(Self {
            count: histogram.count(),
            p50,
            p90,
            p99,
            max: histogram.max(),
        })
    }
}

pub(crate) fn compute_summary_stats(report: &RunReport, aggregates: &Aggregates) -> SummaryStats {
    let rate_x100 = |name: &str| {
        aggregates
            .rate(name)
            .map_or(0, |rate| rate.ppm().checked_div(PPM_PER_BASIS_POINT).unwrap_or(0))
    };
    let duration_ms = report.stats.elapsed.as_millis().max(1);
    let iterations_per_min_x100 = u128::from(report.verdict.counts.iterations)
        .saturating_mul(6_000_000)
        .checked_div(duration_ms)
        .unwrap_or(0);

    SummaryStats {
        http_failure_rate_x100: rate_x100(names::HTTP_REQ_FAILED),
        task_failure_rate_x100: rate_x100(names::TASK_FAILED),
        iterations_per_min_x100: u64::try_from(iterations_per_min_x100).unwrap_or(u64::MAX),
    }
}

pub(crate) fn summary_lines(report: &RunReport, aggregates: &Aggregates) -> AppResult<Vec<String>> {
    let stats = compute_summary_stats(report, aggregates);
    let counts = &report.verdict.counts;
    let processing = LatencyLine::from_values(aggregates.trend(names::PROCESSING_LATENCY))?;
    let http = LatencyLine::from_values(aggregates.trend(names::HTTP_REQ_DURATION))?;

    let mut lines = vec![
        format!("Duration: {}s", report.stats.elapsed.as_secs()),
        format!(
            "Users: {} ({} signup failures)",
            report.identities, report.provisioning_failures
        ),
        format!(
            "Iterations: {} ({}.{:02}/min, {} aborted)",
            counts.iterations,
            stats.iterations_per_min_x100 / PERCENT_DIVISOR,
            stats.iterations_per_min_x100 % PERCENT_DIVISOR,
            report.stats.total_aborted()
        ),
        format!(
            "HTTP Requests: {} ({}.{:02}% failed)",
            counts.http_reqs,
            stats.http_failure_rate_x100 / PERCENT_DIVISOR,
            stats.http_failure_rate_x100 % PERCENT_DIVISOR
        ),
        format!("Videos Processed: {}", counts.videos_processed),
        format!(
            "Failures: {} upload / {} processing / {} auth ({}.{:02}% of tasks)",
            counts.upload_failures,
            counts.processing_failures,
            counts.auth_failures,
            stats.task_failure_rate_x100 / PERCENT_DIVISOR,
            stats.task_failure_rate_x100 % PERCENT_DIVISOR
        ),
        format!(
            "Timeouts: {} (poll misses: {})",
            counts.poll_timeouts, counts.poll_misses
        ),
        format!(
            "Reads: {} failed, votes: {}",
            counts.read_failures, counts.votes
        ),
        latency_line("Processing Latency", &processing),
        latency_line("HTTP Latency", &http),
    ];
    lines.extend(threshold_lines(&report.verdict));
    Ok(lines)
}

fn latency_line(label: &str, line: &LatencyLine) -> String {
    if line.count == 0 {
        return format!("{}: no samples", label);
    }
    format!(
        "{} P50/P90/P99 (max): {}ms / {}ms / {}ms ({}ms, n={})",
        label, line.p50, line.p90, line.p99, line.max, line.count
    )
}

pub(crate) fn threshold_lines(verdict: &RunVerdict) -> Vec<String> {
    let mut lines = Vec::with_capacity(verdict.thresholds.len().saturating_add(2));
    lines.push("Thresholds:".to_owned());
    for result in &verdict.thresholds {
        let mark = if result.no_data {
            "skip"
        } else if result.passed {
            "pass"
        } else {
            "FAIL"
        };
        lines.push(format!(
            "  [{}] {}: {} (observed {})",
            mark,
            result.metric,
            result.expression,
            result.observed_display()
        ));
    }
    lines.push(if verdict.passed {
        "Verdict: PASSED".to_owned()
    } else {
        "Verdict: FAILED".to_owned()
    });
    lines
}

/// Print the run summary to stdout.
///
/// # Errors
///
/// Returns an error if a latency histogram cannot be built.
pub(crate) fn print_summary(report: &RunReport, aggregates: &Aggregates) -> AppResult<()> {
    for line in summary_lines(report, aggregates)? {
        println!("{}", line);
    }
    Ok(())
}
