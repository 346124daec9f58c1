use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("No test identities could be provisioned ({failures} of {requested} signups failed).")]
    EmptyPool { requested: usize, failures: usize },
    #[error("Provisioning was cancelled.")]
    Cancelled,
}
