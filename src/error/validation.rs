use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid rate '{value}'. Expected a fraction like 0.05 or a percentage like 5%.")]
    InvalidRate { value: String },
    #[error("Rate '{value}' must be between 0 and 1 (0% and 100%).")]
    RateOutOfRange { value: String },
    #[error("Missing base URL (set --base-url or provide base_url in config).")]
    MissingBaseUrl,
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Base URL is missing host.")]
    BaseUrlMissingHost,
    #[error("--user-email and --user-password must be given together.")]
    UserCredentialsIncomplete,
    #[error("Invalid threshold '{value}'. Expected 'metric:expression' (e.g., 'http_req_failed:rate<0.01').")]
    InvalidThresholdFormat { value: String },
    #[error(
        "Invalid threshold expression '{expression}'. Expected <aggregation><op><value> with aggregation avg, min, max, med, count, rate or p(N)."
    )]
    InvalidThresholdExpression { expression: String },
    #[error("Percentile must be between 1 and 100, got {value}.")]
    PercentileOutOfRange { value: u64 },
    #[error("Unknown metric '{name}'.")]
    UnknownMetric { name: String },
    #[error("Aggregation '{aggregation}' cannot be applied to {kind} metric '{metric}'.")]
    AggregationKindMismatch {
        metric: String,
        aggregation: String,
        kind: &'static str,
    },
    #[error("Failed to build runtime: {source}")]
    RuntimeBuildFailed {
        #[source]
        source: std::io::Error,
    },
    #[error("One or more thresholds failed.")]
    ThresholdsFailed,
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
