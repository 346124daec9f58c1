use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::args::{RatePpm, parse_duration_value};
use crate::error::ValidationError;

use super::aggregate::{Aggregates, average, percentile};
use super::store::duration_ms;
use super::types::{MetricKind, metric_kind};

/// Largest percentile accepted by `p(N)`.
const MAX_PERCENTILE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Percentile(u64),
    Avg,
    Min,
    Max,
    Med,
    Count,
    Rate,
}

impl Aggregation {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "avg" => Some(Aggregation::Avg),
            "min" => Some(Aggregation::Min),
            "max" => Some(Aggregation::Max),
            "med" => Some(Aggregation::Med),
            "count" => Some(Aggregation::Count),
            "rate" => Some(Aggregation::Rate),
            other => {
                let inner = other.strip_prefix("p(")?.strip_suffix(')')?;
                inner.trim().parse().ok().map(Aggregation::Percentile)
            }
        }
    }

    const fn applies_to(self, kind: MetricKind) -> bool {
        match self {
            Aggregation::Count => true,
            Aggregation::Rate => matches!(kind, MetricKind::Rate),
            Aggregation::Percentile(_)
            | Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::Med => matches!(kind, MetricKind::Trend),
        }
    }

    const fn unit(self) -> ValueUnit {
        match self {
            Aggregation::Count => ValueUnit::Count,
            Aggregation::Rate => ValueUnit::Ppm,
            Aggregation::Percentile(_)
            | Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::Med => ValueUnit::Millis,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Percentile(p) => write!(f, "p({})", p),
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Count => f.write_str("count"),
            Aggregation::Rate => f.write_str("rate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparator {
    /// Operators ordered so two-character forms match first.
    const TOKENS: [(&'static str, Comparator); 5] = [
        ("<=", Comparator::Le),
        (">=", Comparator::Ge),
        ("==", Comparator::Eq),
        ("<", Comparator::Lt),
        (">", Comparator::Gt),
    ];

    #[must_use]
    pub const fn holds(self, observed: u64, bound: u64) -> bool {
        match self {
            Comparator::Lt => observed < bound,
            Comparator::Le => observed <= bound,
            Comparator::Gt => observed > bound,
            Comparator::Ge => observed >= bound,
            Comparator::Eq => observed == bound,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Eq => "==",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueUnit {
    Millis,
    Count,
    Ppm,
}

impl ValueUnit {
    #[must_use]
    pub fn format(self, value: u64) -> String {
        match self {
            ValueUnit::Millis => format!("{}ms", value),
            ValueUnit::Count => value.to_string(),
            ValueUnit::Ppm => RatePpm::from_ppm(value)
                .map_or_else(|| value.to_string(), |rate| rate.to_string()),
        }
    }
}

/// A pass/fail predicate over one aggregated metric, e.g.
/// `processing_latency_ms: p(95)<180s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSpec {
    pub metric: String,
    pub aggregation: Aggregation,
    pub comparator: Comparator,
    /// Milliseconds, a plain count, or parts per million, depending on the aggregation.
    pub bound: u64,
}

impl ThresholdSpec {
    /// Parses a k6-style expression against a known metric.
    ///
    /// # Errors
    ///
    /// Returns an error when the metric is unknown, the expression is
    /// malformed, or the aggregation does not fit the metric kind.
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ValidationError> {
        let kind = metric_kind(metric).ok_or_else(|| ValidationError::UnknownMetric {
            name: metric.to_owned(),
        })?;
        let compact: String = expression.chars().filter(|ch| !ch.is_whitespace()).collect();
        let invalid = || ValidationError::InvalidThresholdExpression {
            expression: expression.to_owned(),
        };

        let (position, token, comparator) = Comparator::TOKENS
            .iter()
            .filter_map(|(token, comparator)| {
                compact
                    .find(token)
                    .map(|position| (position, *token, *comparator))
            })
            .min_by_key(|(position, token, _)| (*position, usize::MAX.saturating_sub(token.len())))
            .ok_or_else(invalid)?;
        let (aggregation_text, rest) = compact.split_at(position);
        let bound_text = rest.get(token.len()..).ok_or_else(invalid)?;

        let aggregation = Aggregation::parse(aggregation_text).ok_or_else(invalid)?;
        if let Aggregation::Percentile(value) = aggregation
            && (value == 0 || value > MAX_PERCENTILE)
        {
            return Err(ValidationError::PercentileOutOfRange { value });
        }
        if !aggregation.applies_to(kind) {
            return Err(ValidationError::AggregationKindMismatch {
                metric: metric.to_owned(),
                aggregation: aggregation.to_string(),
                kind: kind.as_str(),
            });
        }

        let bound = parse_bound(aggregation.unit(), bound_text).ok_or_else(invalid)?;
        Ok(Self {
            metric: metric.to_owned(),
            aggregation,
            comparator,
            bound,
        })
    }

    /// `metric: p(N) < limit` over a millisecond trend.
    #[must_use]
    pub fn percentile_below(metric: &str, percentile: u64, limit: Duration) -> Self {
        Self {
            metric: metric.to_owned(),
            aggregation: Aggregation::Percentile(percentile),
            comparator: Comparator::Lt,
            bound: duration_ms(limit),
        }
    }

    /// `metric: rate < limit` over a rate metric.
    #[must_use]
    pub fn rate_below(metric: &str, limit: RatePpm) -> Self {
        Self {
            metric: metric.to_owned(),
            aggregation: Aggregation::Rate,
            comparator: Comparator::Lt,
            bound: limit.ppm(),
        }
    }

    /// Canonical expression text, e.g. `p(95)<180000ms`.
    #[must_use]
    pub fn expression(&self) -> String {
        format!(
            "{}{}{}",
            self.aggregation,
            self.comparator.as_str(),
            self.aggregation.unit().format(self.bound)
        )
    }

    /// Aggregated value the predicate is checked against; `None` without data.
    #[must_use]
    pub fn observe(&self, aggregates: &Aggregates) -> Option<u64> {
        let values = aggregates.trend(&self.metric);
        match self.aggregation {
            Aggregation::Count => Some(
                aggregates
                    .series(&self.metric)
                    .map_or(0, |series| match series.kind {
                        MetricKind::Counter => aggregates.counter(&self.metric),
                        MetricKind::Trend | MetricKind::Rate => {
                            u64::try_from(series.values.len()).unwrap_or(u64::MAX)
                        }
                    }),
            ),
            Aggregation::Rate => aggregates.rate(&self.metric).map(RatePpm::ppm),
            Aggregation::Percentile(p) => (!values.is_empty()).then(|| percentile(values, p)),
            Aggregation::Med => (!values.is_empty()).then(|| percentile(values, 50)),
            Aggregation::Avg => (!values.is_empty()).then(|| average(values)),
            Aggregation::Min => values.first().copied(),
            Aggregation::Max => values.last().copied(),
        }
    }

    #[must_use]
    pub fn evaluate(&self, aggregates: &Aggregates) -> ThresholdResult {
        let observed = self.observe(aggregates);
        let passed = observed.is_none_or(|value| self.comparator.holds(value, self.bound));
        ThresholdResult {
            metric: self.metric.clone(),
            expression: self.expression(),
            observed,
            unit: self.aggregation.unit(),
            passed,
            no_data: observed.is_none(),
        }
    }
}

impl fmt::Display for ThresholdSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric, self.expression())
    }
}

/// Outcome of one threshold at run end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: Option<u64>,
    pub unit: ValueUnit,
    pub passed: bool,
    pub no_data: bool,
}

impl ThresholdResult {
    #[must_use]
    pub fn observed_display(&self) -> String {
        self.observed
            .map_or_else(|| "no data".to_owned(), |value| self.unit.format(value))
    }
}

fn parse_bound(unit: ValueUnit, text: &str) -> Option<u64> {
    if text.is_empty() {
        return None;
    }
    match unit {
        ValueUnit::Ppm => text.parse::<RatePpm>().ok().map(RatePpm::ppm),
        ValueUnit::Count => text.parse().ok(),
        ValueUnit::Millis => {
            if text.chars().all(|ch| ch.is_ascii_digit()) {
                return text.parse().ok();
            }
            parse_duration_value(text).ok().map(duration_ms)
        }
    }
}
