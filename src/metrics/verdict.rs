use serde::Serialize;
use std::time::Duration;

use crate::args::RatePpm;

use super::aggregate::Aggregates;
use super::threshold::{ThresholdResult, ThresholdSpec};
use super::types::names;

/// Percentile gated by the default latency threshold.
const DEFAULT_LATENCY_PERCENTILE: u64 = 95;

/// Totals reported next to the threshold table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub iterations: u64,
    pub http_reqs: u64,
    pub videos_processed: u64,
    pub processing_failures: u64,
    pub upload_failures: u64,
    pub auth_failures: u64,
    pub poll_timeouts: u64,
    pub poll_misses: u64,
    pub read_failures: u64,
    pub votes: u64,
}

impl OutcomeCounts {
    #[must_use]
    pub fn from_aggregates(aggregates: &Aggregates) -> Self {
        Self {
            iterations: aggregates.counter(names::ITERATIONS),
            http_reqs: aggregates.counter(names::HTTP_REQS),
            videos_processed: aggregates.counter(names::VIDEOS_PROCESSED),
            processing_failures: aggregates.counter(names::PROCESSING_FAILURES),
            upload_failures: aggregates.counter(names::UPLOAD_FAILURES),
            auth_failures: aggregates.counter(names::AUTH_FAILURES),
            poll_timeouts: aggregates.counter(names::POLL_TIMEOUTS),
            poll_misses: aggregates.counter(names::POLL_MISSES),
            read_failures: aggregates.counter(names::READ_FAILURES),
            votes: aggregates.counter(names::VOTES),
        }
    }

    /// Every counted failure except timeouts.
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.upload_failures
            .saturating_add(self.processing_failures)
            .saturating_add(self.auth_failures)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunVerdict {
    pub passed: bool,
    pub thresholds: Vec<ThresholdResult>,
    pub counts: OutcomeCounts,
}

impl RunVerdict {
    #[must_use]
    pub fn evaluate(thresholds: &[ThresholdSpec], aggregates: &Aggregates) -> Self {
        let results: Vec<ThresholdResult> = thresholds
            .iter()
            .map(|threshold| threshold.evaluate(aggregates))
            .collect();
        Self {
            passed: results.iter().all(|result| result.passed),
            thresholds: results,
            counts: OutcomeCounts::from_aggregates(aggregates),
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &ThresholdResult> + '_ {
        self.thresholds.iter().filter(|result| !result.passed)
    }
}

/// The two gates every run carries unless overridden.
#[must_use]
pub fn default_thresholds(latency: Duration, error_rate: RatePpm) -> Vec<ThresholdSpec> {
    vec![
        ThresholdSpec::percentile_below(
            names::PROCESSING_LATENCY,
            DEFAULT_LATENCY_PERCENTILE,
            latency,
        ),
        ThresholdSpec::rate_below(names::HTTP_REQ_FAILED, error_rate),
    ]
}

/// Explicit thresholds replace the defaults for the metrics they name.
#[must_use]
pub fn merge_thresholds(
    defaults: Vec<ThresholdSpec>,
    explicit: &[ThresholdSpec],
) -> Vec<ThresholdSpec> {
    let mut merged: Vec<ThresholdSpec> = defaults
        .into_iter()
        .filter(|default| {
            !explicit
                .iter()
                .any(|threshold| threshold.metric == default.metric)
        })
        .collect();
    merged.extend(explicit.iter().cloned());
    merged
}
