use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

use crate::client::WorkflowClient;
use crate::error::SetupError;
use crate::shutdown::ShutdownReceiver;

use super::pool::IdentityPool;
use super::types::{SignupProfile, TestIdentity};

#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub count: usize,
    pub password: String,
    /// Pause between consecutive signups.
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub pool: IdentityPool,
    pub failures: usize,
}

/// Signs up `count` fresh accounts one after another.
///
/// Failed signups are logged and skipped; the run continues with whatever
/// pool remains as long as it is non-empty.
///
/// # Errors
///
/// Returns an error when no signup succeeded or shutdown arrived mid-setup.
pub async fn provision(
    client: &dyn WorkflowClient,
    settings: &ProvisionSettings,
    shutdown_rx: &mut ShutdownReceiver,
) -> Result<ProvisionReport, SetupError> {
    let run_tag = chrono::Utc::now().timestamp_millis();
    let run_salt: u32 = rand::thread_rng().gen_range(0..1_000_000);
    let mut identities = Vec::with_capacity(settings.count);
    let mut failures = 0usize;

    for index in 0..settings.count {
        if index > 0 && !settings.delay.is_zero() {
            tokio::select! {
                _ = shutdown_rx.recv() => return Err(cancelled(&identities, failures)),
                () = tokio::time::sleep(settings.delay) => {}
            }
        }

        let identity = TestIdentity::new(
            format!("loadtest_{}_{}_{}@example.com", run_tag, run_salt, index),
            settings.password.clone(),
        );
        let profile = SignupProfile::for_load_test(index, &identity);
        let result = tokio::select! {
            _ = shutdown_rx.recv() => return Err(cancelled(&identities, failures)),
            result = client.signup(&profile) => result,
        };
        match result {
            Ok(()) => identities.push(identity),
            Err(err) => {
                failures = failures.saturating_add(1);
                warn!("Signup {} ({}) failed: {}", index, identity.email, err);
            }
        }
    }

    if identities.is_empty() {
        return Err(SetupError::EmptyPool {
            requested: settings.count,
            failures,
        });
    }
    if failures > 0 {
        warn!(
            "Provisioned {} of {} users; continuing with a reduced pool.",
            identities.len(),
            settings.count
        );
    } else {
        info!("Provisioned {} users.", identities.len());
    }

    Ok(ProvisionReport {
        pool: IdentityPool::new(identities),
        failures,
    })
}

/// Pool holding a single operator-supplied account.
#[must_use]
pub fn existing_identity(email: &str, password: &str) -> ProvisionReport {
    info!("Using existing user {}; skipping signup.", email);
    ProvisionReport {
        pool: IdentityPool::new(vec![TestIdentity::new(email, password)]),
        failures: 0,
    }
}

fn cancelled(
    identities: &[TestIdentity],
    failures: usize,
) -> SetupError {
    warn!(
        "Provisioning interrupted after {} users ({} failed signups).",
        identities.len(),
        failures
    );
    SetupError::Cancelled
}
