//! One-time test identity setup shared by every worker.
mod pool;
mod provisioner;
mod types;


pub use pool::IdentityPool;
pub use provisioner::{ProvisionReport, ProvisionSettings, existing_identity, provision};
pub use types::{SignupProfile, TestIdentity};
