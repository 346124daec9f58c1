use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::args::{RatePpm, WorkflowKind, parse_duration_value};
use crate::error::ValidationError;

/// File form of the run options; keys mirror the long CLI flags.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    #[serde(alias = "concurrency")]
    pub vus: Option<usize>,
    pub duration: Option<DurationValue>,
    pub iterations: Option<u64>,
    pub users: Option<usize>,
    pub user_email: Option<String>,
    pub user_password: Option<String>,
    pub signup_password: Option<String>,
    pub setup_delay: Option<DurationValue>,
    pub workflow: Option<WorkflowKind>,
    pub vote: Option<bool>,
    pub batch_size: Option<usize>,
    pub video_file: Option<String>,
    pub poll_interval: Option<DurationValue>,
    pub max_poll_attempts: Option<u64>,
    pub dwell: Option<DurationValue>,
    pub timeout: Option<DurationValue>,
    pub connect_timeout: Option<DurationValue>,
    pub latency_threshold: Option<DurationValue>,
    pub error_rate_threshold: Option<RateValue>,
    /// Metric name to k6-style expressions, e.g. `http_req_failed = ["rate<0.01"]`.
    pub thresholds: Option<BTreeMap<String, Vec<String>>>,
    pub export_json: Option<String>,
    pub export_csv: Option<String>,
    pub no_color: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RateValue {
    Number(f64),
    Text(String),
}

impl RateValue {
    pub(crate) fn to_rate(&self) -> Result<RatePpm, ValidationError> {
        match self {
            RateValue::Number(value) => value.to_string().parse(),
            RateValue::Text(text) => text.parse(),
        }
    }
}
