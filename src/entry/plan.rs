use clap::ArgMatches;
use tracing::{error, info};

use crate::app::run_load_test;
use crate::args::RunArgs;
use crate::error::{AppError, AppResult, ValidationError};
use crate::shutdown::shutdown_channel;
use crate::shutdown_handlers::setup_signal_shutdown_handler;

/// Validated arguments ready to run.
#[derive(Debug)]
pub(super) struct RunPlan {
    pub(super) args: RunArgs,
    pub(super) base_url: url::Url,
}

/// Merges the config file into `args`. Called before logging is initialized.
pub(super) fn apply_config_file(mut args: RunArgs, matches: &ArgMatches) -> AppResult<RunArgs> {
    if let Some(config) = crate::config::load_config(args.config.as_deref())? {
        crate::config::apply_config(&mut args, matches, &config)?;
    }
    Ok(args)
}

pub(super) fn build_plan(args: RunArgs) -> AppResult<RunPlan> {
    let base_url = validate_base_url(args.base_url.as_deref())?;
    validate_credentials(&args)?;
    Ok(RunPlan { args, base_url })
}

pub(super) fn validate_base_url(raw: Option<&str>) -> Result<url::Url, ValidationError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingBaseUrl)?;
    let parsed = url::Url::parse(raw).map_err(|source| ValidationError::InvalidBaseUrl {
        url: raw.to_owned(),
        source,
    })?;
    if parsed.host_str().is_none() {
        return Err(ValidationError::BaseUrlMissingHost);
    }
    Ok(parsed)
}

pub(super) const fn validate_credentials(args: &RunArgs) -> Result<(), ValidationError> {
    match (&args.user_email, &args.user_password) {
        (Some(_), None) | (None, Some(_)) => Err(ValidationError::UserCredentialsIncomplete),
        (Some(_), Some(_)) | (None, None) => Ok(()),
    }
}

pub(super) async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    info!("Target: {}", plan.base_url);
    let (shutdown_tx, _) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let result = run_load_test(&plan.args, &shutdown_tx).await;
    drop(shutdown_tx.send(()));
    signal_handle.await?;

    let report = result?;
    if report.verdict.passed {
        Ok(())
    } else {
        error!("Run failed: one or more thresholds were not met.");
        Err(AppError::validation(ValidationError::ThresholdsFailed))
    }
}
