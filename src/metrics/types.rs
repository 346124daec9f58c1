use serde::Serialize;
use std::fmt;

/// How samples of a metric are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Distribution of millisecond values.
    Trend,
    /// Sum of increments.
    Counter,
    /// Fraction of samples with value 1.
    Rate,
}

impl MetricKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricKind::Trend => "trend",
            MetricKind::Counter => "counter",
            MetricKind::Rate => "rate",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded observation. Never mutated after it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricSample {
    pub name: &'static str,
    pub kind: MetricKind,
    pub value: u64,
    pub timestamp_ms: i64,
}

impl MetricSample {
    #[must_use]
    pub fn now(name: &'static str, kind: MetricKind, value: u64) -> Self {
        Self {
            name,
            kind,
            value,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

pub mod names {
    pub const PROCESSING_LATENCY: &str = "processing_latency_ms";
    pub const HTTP_REQ_DURATION: &str = "http_req_duration_ms";
    pub const UPLOAD_DURATION: &str = "upload_duration_ms";
    pub const ITERATION_DURATION: &str = "iteration_duration_ms";

    pub const ITERATIONS: &str = "iterations";
    pub const HTTP_REQS: &str = "http_reqs";
    pub const VIDEOS_PROCESSED: &str = "videos_processed";
    pub const PROCESSING_FAILURES: &str = "processing_failures";
    pub const UPLOAD_FAILURES: &str = "upload_failures";
    pub const AUTH_FAILURES: &str = "auth_failures";
    pub const POLL_TIMEOUTS: &str = "poll_timeouts";
    pub const POLL_MISSES: &str = "poll_misses";
    pub const READ_FAILURES: &str = "read_failures";
    pub const VOTES: &str = "votes";

    pub const HTTP_REQ_FAILED: &str = "http_req_failed";
    pub const TASK_FAILED: &str = "task_failed";
}

/// Every metric the harness emits. Thresholds may only reference these.
pub const METRIC_CATALOG: [(&str, MetricKind); 16] = [
    (names::PROCESSING_LATENCY, MetricKind::Trend),
    (names::HTTP_REQ_DURATION, MetricKind::Trend),
    (names::UPLOAD_DURATION, MetricKind::Trend),
    (names::ITERATION_DURATION, MetricKind::Trend),
    (names::ITERATIONS, MetricKind::Counter),
    (names::HTTP_REQS, MetricKind::Counter),
    (names::VIDEOS_PROCESSED, MetricKind::Counter),
    (names::PROCESSING_FAILURES, MetricKind::Counter),
    (names::UPLOAD_FAILURES, MetricKind::Counter),
    (names::AUTH_FAILURES, MetricKind::Counter),
    (names::POLL_TIMEOUTS, MetricKind::Counter),
    (names::POLL_MISSES, MetricKind::Counter),
    (names::READ_FAILURES, MetricKind::Counter),
    (names::VOTES, MetricKind::Counter),
    (names::HTTP_REQ_FAILED, MetricKind::Rate),
    (names::TASK_FAILED, MetricKind::Rate),
];

#[must_use]
pub fn metric_kind(name: &str) -> Option<MetricKind> {
    METRIC_CATALOG
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, kind)| *kind)
}
