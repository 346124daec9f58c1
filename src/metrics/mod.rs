//! Sample store, aggregation, histograms and threshold evaluation.
mod aggregate;
mod histogram;
mod store;
mod threshold;
mod types;
mod verdict;


pub use aggregate::{Aggregates, MetricSeries, average, percentile};
pub use histogram::LatencyHistogram;
pub use store::{MetricsStore, SampleBatch};
pub use threshold::{Aggregation, Comparator, ThresholdResult, ThresholdSpec, ValueUnit};
pub use types::{METRIC_CATALOG, MetricKind, MetricSample, metric_kind, names};
pub use verdict::{OutcomeCounts, RunVerdict, default_thresholds, merge_thresholds};

pub(crate) use store::duration_ms;
