use std::collections::BTreeMap;

use crate::args::RatePpm;

use super::types::{MetricKind, MetricSample};

/// Percentage divisor for percentile math.
const PERCENT_DIVISOR: u64 = 100;
/// Rounding offset for percentile selection.
const PERCENTILE_ROUNDING: u64 = 50;

#[derive(Debug, Clone)]
pub struct MetricSeries {
    pub kind: MetricKind,
    /// Sorted ascending for trends; recording order otherwise.
    pub values: Vec<u64>,
}

/// Per-metric view over a sample set.
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    series: BTreeMap<&'static str, MetricSeries>,
}

impl Aggregates {
    #[must_use]
    pub fn from_samples(samples: &[MetricSample]) -> Self {
        let mut series: BTreeMap<&'static str, MetricSeries> = BTreeMap::new();
        for sample in samples {
            series
                .entry(sample.name)
                .or_insert_with(|| MetricSeries {
                    kind: sample.kind,
                    values: Vec::new(),
                })
                .values
                .push(sample.value);
        }
        for entry in series.values_mut() {
            if entry.kind == MetricKind::Trend {
                entry.values.sort_unstable();
            }
        }
        Self { series }
    }

    #[must_use]
    pub fn series(&self, name: &str) -> Option<&MetricSeries> {
        self.series.get(name)
    }

    /// Sum of all increments recorded under a counter.
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.series.get(name).map_or(0, |entry| {
            entry
                .values
                .iter()
                .fold(0u64, |total, value| total.saturating_add(*value))
        })
    }

    /// Number of samples recorded under `name`.
    #[must_use]
    pub fn sample_count(&self, name: &str) -> usize {
        self.series.get(name).map_or(0, |entry| entry.values.len())
    }

    /// Sorted values of a trend, empty when nothing was recorded.
    #[must_use]
    pub fn trend(&self, name: &str) -> &[u64] {
        self.series
            .get(name)
            .map_or(&[], |entry| entry.values.as_slice())
    }

    /// Fraction of samples with a non-zero value.
    #[must_use]
    pub fn rate(&self, name: &str) -> Option<RatePpm> {
        let entry = self.series.get(name)?;
        let hits = entry.values.iter().filter(|value| **value > 0).count();
        RatePpm::of(
            u64::try_from(hits).unwrap_or(u64::MAX),
            u64::try_from(entry.values.len()).unwrap_or(u64::MAX),
        )
    }
}

/// Nearest-rank percentile over an ascending slice; 0 for an empty slice.
#[must_use]
pub fn percentile(sorted: &[u64], percentile: u64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let count = u64::try_from(sorted.len().saturating_sub(1)).unwrap_or(u64::MAX);
    let index = percentile
        .min(PERCENT_DIVISOR)
        .saturating_mul(count)
        .saturating_add(PERCENTILE_ROUNDING)
        .checked_div(PERCENT_DIVISOR)
        .unwrap_or(0);
    let idx = usize::try_from(index).unwrap_or_else(|_| sorted.len().saturating_sub(1));
    sorted
        .get(idx)
        .or_else(|| sorted.last())
        .copied()
        .unwrap_or(0)
}

/// Integer mean, rounded down; 0 for an empty slice.
#[must_use]
pub fn average(values: &[u64]) -> u64 {
    let sum = values
        .iter()
        .fold(0u128, |total, value| total.saturating_add(u128::from(*value)));
    let avg = sum
        .checked_div(u128::try_from(values.len()).unwrap_or(u128::MAX))
        .unwrap_or(0);
    u64::try_from(avg).unwrap_or(u64::MAX)
}
