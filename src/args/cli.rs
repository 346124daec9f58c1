use clap::Parser;
use std::time::Duration;

use crate::metrics::ThresholdSpec;

use super::defaults::DEFAULT_SIGNUP_PASSWORD;
use super::parsers::{
    parse_duration_arg, parse_positive_u64, parse_positive_usize, parse_rate,
    parse_threshold_arg,
};
use super::types::{PositiveU64, PositiveUsize, RatePpm, WorkflowKind};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Async load harness for video upload-and-voting APIs - provisions test users, drives upload/poll workflows across virtual users, and gates runs on latency and error-rate thresholds."
)]
pub struct RunArgs {
    /// Base URL of the service under test (e.g., http://localhost:8000)
    #[arg(long = "base-url", short = 'u', env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Number of concurrent virtual users
    #[arg(
        long = "vus",
        alias = "concurrency",
        default_value = "5",
        value_parser = parse_positive_usize
    )]
    pub vus: PositiveUsize,

    /// Duration of the load phase (supports ms/s/m/h)
    #[arg(
        long = "duration",
        short = 't',
        default_value = "2m",
        value_parser = parse_duration_arg
    )]
    pub duration: Duration,

    /// Stop each virtual user after N iterations
    #[arg(long = "iterations", short = 'i', value_parser = parse_positive_u64)]
    pub iterations: Option<PositiveU64>,

    /// Number of test users to sign up before the load phase (defaults to --vus)
    #[arg(long = "users", value_parser = parse_positive_usize)]
    pub users: Option<PositiveUsize>,

    /// Use an existing account instead of signing up test users
    #[arg(long = "user-email", env = "USER_EMAIL")]
    pub user_email: Option<String>,

    /// Password of the existing account given by --user-email
    #[arg(long = "user-password", env = "USER_PASS", hide_env_values = true)]
    pub user_password: Option<String>,

    /// Password assigned to provisioned test users
    #[arg(long = "signup-password", default_value = DEFAULT_SIGNUP_PASSWORD, hide_default_value = true)]
    pub signup_password: String,

    /// Pause between signup requests during setup (supports ms/s/m/h)
    #[arg(
        long = "setup-delay",
        default_value = "100ms",
        value_parser = parse_duration_arg
    )]
    pub setup_delay: Duration,

    /// Request sequence each virtual user runs per iteration
    #[arg(long = "workflow", short = 'w', default_value = "upload", ignore_case = true)]
    pub workflow: WorkflowKind,

    /// Vote on the first public video during browse reads
    #[arg(long = "vote")]
    pub vote: bool,

    /// Uploads submitted per iteration
    #[arg(
        long = "batch-size",
        short = 'b',
        default_value = "1",
        value_parser = parse_positive_usize
    )]
    pub batch_size: PositiveUsize,

    /// Video file to upload (a small placeholder payload is used when omitted)
    #[arg(long = "video-file", short = 'f', env = "FILE_PATH")]
    pub video_file: Option<String>,

    /// Pause between status polling rounds (supports ms/s/m/h)
    #[arg(
        long = "poll-interval",
        default_value = "10s",
        value_parser = parse_duration_arg
    )]
    pub poll_interval: Duration,

    /// Polling rounds per iteration before unfinished uploads count as timed out
    #[arg(
        long = "max-poll-attempts",
        default_value = "60",
        value_parser = parse_positive_u64
    )]
    pub max_poll_attempts: PositiveU64,

    /// Pause at the end of every iteration (supports ms/s/m/h)
    #[arg(long = "dwell", default_value = "1s", value_parser = parse_duration_arg)]
    pub dwell: Duration,

    /// Request timeout (supports ms/s/m/h)
    #[arg(
        long = "timeout",
        default_value = "30s",
        value_parser = parse_duration_arg
    )]
    pub request_timeout: Duration,

    /// Timeout for establishing a new connection (supports ms/s/m/h)
    #[arg(
        long = "connect-timeout",
        default_value = "5s",
        value_parser = parse_duration_arg
    )]
    pub connect_timeout: Duration,

    /// p95 bound for upload-to-processed latency (supports ms/s/m/h)
    #[arg(
        long = "latency-threshold",
        default_value = "180s",
        value_parser = parse_duration_arg
    )]
    pub latency_threshold: Duration,

    /// Maximum failed-request rate (e.g., 0.05 or 5%)
    #[arg(
        long = "error-rate-threshold",
        default_value = "0.05",
        value_parser = parse_rate
    )]
    pub error_rate_threshold: RatePpm,

    /// Extra threshold as 'metric:expression' (repeatable), e.g. 'http_req_duration_ms:p(95)<500'
    #[arg(long = "threshold", value_parser = parse_threshold_arg)]
    pub thresholds: Vec<ThresholdSpec>,

    /// Write the verdict and raw samples as JSON
    #[arg(long = "export-json")]
    pub export_json: Option<String>,

    /// Write the raw samples as CSV
    #[arg(long = "export-csv")]
    pub export_csv: Option<String>,

    /// Enable verbose logging (sets log level to debug unless overridden by VIDSTRESS_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Path to config file (TOML/JSON). Defaults to ./vidstress.toml or ./vidstress.json if present.
    #[arg(long)]
    pub config: Option<String>,
}

impl RunArgs {
    /// Number of identities to provision when no existing account is supplied.
    #[must_use]
    pub fn identity_target(&self) -> usize {
        self.users.map_or_else(|| self.vus.get(), PositiveUsize::get)
    }
}
