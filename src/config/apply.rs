use clap::ArgMatches;
use clap::parser::ValueSource;
use std::time::Duration;

use crate::args::{PositiveU64, PositiveUsize, RunArgs};
use crate::error::{AppError, AppResult, ConfigError};
use crate::metrics::ThresholdSpec;

use super::types::{ConfigFile, DurationValue};

/// Applies configuration values to CLI arguments. Values given on the
/// command line win.
///
/// # Errors
///
/// Returns an error when a config value is invalid.
pub fn apply_config(args: &mut RunArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    apply_target(args, matches, config)?;
    apply_identity(args, matches, config)?;
    apply_workflow(args, matches, config)?;
    apply_thresholds(args, matches, config)?;
    apply_output(args, matches, config);
    Ok(())
}

fn apply_target(args: &mut RunArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if !is_cli(matches, "base_url")
        && let Some(url) = config.base_url.clone()
    {
        args.base_url = Some(url);
    }

    if !is_cli(matches, "vus")
        && let Some(vus) = config.vus
    {
        args.vus = ensure_positive_usize(vus, "vus")?;
    }

    if !is_cli(matches, "duration")
        && let Some(duration) = config.duration.as_ref()
    {
        args.duration = to_duration(duration, "duration")?;
    }

    if !is_cli(matches, "iterations")
        && let Some(iterations) = config.iterations
    {
        args.iterations = Some(ensure_positive_u64(iterations, "iterations")?);
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = to_duration(timeout, "timeout")?;
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = to_duration(timeout, "connect_timeout")?;
    }
    Ok(())
}

fn apply_identity(args: &mut RunArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if !is_cli(matches, "users")
        && let Some(users) = config.users
    {
        args.users = Some(ensure_positive_usize(users, "users")?);
    }

    if !is_cli(matches, "user_email")
        && let Some(email) = config.user_email.clone()
    {
        args.user_email = Some(email);
    }

    if !is_cli(matches, "user_password")
        && let Some(password) = config.user_password.clone()
    {
        args.user_password = Some(password);
    }

    if !is_cli(matches, "signup_password")
        && let Some(password) = config.signup_password.clone()
    {
        args.signup_password = password;
    }

    if !is_cli(matches, "setup_delay")
        && let Some(delay) = config.setup_delay.as_ref()
    {
        args.setup_delay = to_duration(delay, "setup_delay")?;
    }
    Ok(())
}

fn apply_workflow(args: &mut RunArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    if !is_cli(matches, "workflow")
        && let Some(workflow) = config.workflow
    {
        args.workflow = workflow;
    }

    if !is_cli(matches, "vote")
        && let Some(vote) = config.vote
    {
        args.vote = vote;
    }

    if !is_cli(matches, "batch_size")
        && let Some(batch_size) = config.batch_size
    {
        args.batch_size = ensure_positive_usize(batch_size, "batch_size")?;
    }

    if !is_cli(matches, "video_file")
        && let Some(path) = config.video_file.clone()
    {
        args.video_file = Some(path);
    }

    if !is_cli(matches, "poll_interval")
        && let Some(interval) = config.poll_interval.as_ref()
    {
        args.poll_interval = to_duration(interval, "poll_interval")?;
    }

    if !is_cli(matches, "max_poll_attempts")
        && let Some(attempts) = config.max_poll_attempts
    {
        args.max_poll_attempts = ensure_positive_u64(attempts, "max_poll_attempts")?;
    }

    if !is_cli(matches, "dwell")
        && let Some(dwell) = config.dwell.as_ref()
    {
        args.dwell = to_duration(dwell, "dwell")?;
    }
    Ok(())
}

fn apply_thresholds(
    args: &mut RunArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "latency_threshold")
        && let Some(latency) = config.latency_threshold.as_ref()
    {
        args.latency_threshold = to_duration(latency, "latency_threshold")?;
    }

    if !is_cli(matches, "error_rate_threshold")
        && let Some(rate) = config.error_rate_threshold.as_ref()
    {
        args.error_rate_threshold = rate.to_rate().map_err(|err| {
            AppError::config(ConfigError::InvalidRate {
                field: "error_rate_threshold".to_owned(),
                source: err,
            })
        })?;
    }

    if !is_cli(matches, "thresholds")
        && let Some(table) = config.thresholds.as_ref()
    {
        let mut parsed = Vec::new();
        for (metric, expressions) in table {
            for expression in expressions {
                let threshold = ThresholdSpec::parse(metric, expression).map_err(|err| {
                    AppError::config(ConfigError::InvalidThreshold {
                        metric: metric.clone(),
                        source: err,
                    })
                })?;
                parsed.push(threshold);
            }
        }
        args.thresholds = parsed;
    }
    Ok(())
}

fn apply_output(args: &mut RunArgs, matches: &ArgMatches, config: &ConfigFile) {
    if !is_cli(matches, "export_json")
        && let Some(path) = config.export_json.clone()
    {
        args.export_json = Some(path);
    }

    if !is_cli(matches, "export_csv")
        && let Some(path) = config.export_csv.clone()
    {
        args.export_csv = Some(path);
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn to_duration(value: &DurationValue, field: &str) -> AppResult<Duration> {
    value.to_duration().map_err(|err| {
        AppError::config(ConfigError::InvalidDuration {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}
