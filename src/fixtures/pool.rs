use std::sync::Arc;

use super::types::TestIdentity;

/// Immutable identity slice shared by all workers.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    identities: Arc<[TestIdentity]>,
}

impl IdentityPool {
    #[must_use]
    pub fn new(identities: Vec<TestIdentity>) -> Self {
        Self {
            identities: identities.into(),
        }
    }

    /// Identity assigned to a worker; workers wrap around the pool.
    #[must_use]
    pub fn get(&self, worker_index: usize) -> Option<&TestIdentity> {
        let slot = worker_index.checked_rem(self.identities.len())?;
        self.identities.get(slot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
