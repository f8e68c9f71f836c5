//! Static identity directory.

use super::simulate_latency;
use crate::providers::{IdentityDirectory, ProviderError};
use crate::types::{CustomerId, ProfessionalId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Identity directory backed by two in-memory sets.
///
/// By default every id is eligible; [`restricted`](Self::restricted) switches
/// to "only registered ids are eligible".
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Clone, Default)]
pub struct StaticIdentityDirectory {
    customers: Arc<Mutex<HashSet<CustomerId>>>,
    professionals: Arc<Mutex<HashSet<ProfessionalId>>>,
    restricted: bool,
    latency: Option<Duration>,
}

impl StaticIdentityDirectory {
    /// Directory that accepts everyone
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that accepts only registered ids
    #[must_use]
    pub fn restricted() -> Self {
        Self {
            restricted: true,
            ..Self::default()
        }
    }

    /// Delay every call by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Register an eligible customer
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn add_customer(&self, id: CustomerId) {
        self.customers.lock().unwrap().insert(id);
    }

    /// Register an eligible professional
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn add_professional(&self, id: ProfessionalId) {
        self.professionals.lock().unwrap().insert(id);
    }
}

impl IdentityDirectory for StaticIdentityDirectory {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn is_eligible_customer(&self, id: CustomerId) -> Result<bool, ProviderError> {
        simulate_latency(self.latency).await;
        Ok(!self.restricted || self.customers.lock().unwrap().contains(&id))
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn is_eligible_professional(&self, id: ProfessionalId) -> Result<bool, ProviderError> {
        simulate_latency(self.latency).await;
        Ok(!self.restricted || self.professionals.lock().unwrap().contains(&id))
    }
}
