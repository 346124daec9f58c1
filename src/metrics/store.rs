use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::types::{MetricKind, MetricSample};

/// Samples recorded by a single iteration.
///
/// Workers fill a batch locally and hand it to [`MetricsStore::commit`] once
/// the iteration completes, so an iteration cancelled midway contributes
/// nothing to the aggregate.
#[derive(Debug, Default)]
pub struct SampleBatch {
    samples: Vec<MetricSample>,
}

impl SampleBatch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn trend(&mut self, name: &'static str, value_ms: u64) {
        self.samples
            .push(MetricSample::now(name, MetricKind::Trend, value_ms));
    }

    pub fn trend_elapsed(&mut self, name: &'static str, elapsed: Duration) {
        self.trend(name, duration_ms(elapsed));
    }

    pub fn count(&mut self, name: &'static str) {
        self.samples
            .push(MetricSample::now(name, MetricKind::Counter, 1));
    }

    pub fn rate(&mut self, name: &'static str, hit: bool) {
        self.samples
            .push(MetricSample::now(name, MetricKind::Rate, u64::from(hit)));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples recorded under `name`.
    #[must_use]
    pub fn count_of(&self, name: &str) -> usize {
        self.samples
            .iter()
            .filter(|sample| sample.name == name)
            .count()
    }

    /// Values recorded under `name`, in recording order.
    #[must_use]
    pub fn values_of(&self, name: &str) -> Vec<u64> {
        self.samples
            .iter()
            .filter(|sample| sample.name == name)
            .map(|sample| sample.value)
            .collect()
    }
}

/// Process-wide sample store shared by every worker.
///
/// The lock is held only for the append itself and never across an await.
#[derive(Debug, Default)]
pub struct MetricsStore {
    samples: Mutex<Vec<MetricSample>>,
}

impl MetricsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished batch and returns how many samples it carried.
    pub fn commit(&self, batch: SampleBatch) -> usize {
        let appended = batch.samples.len();
        if appended == 0 {
            return 0;
        }
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        samples.extend(batch.samples);
        appended
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every committed sample, in commit order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub(crate) fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
