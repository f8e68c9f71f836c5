//! In-memory dispute repository.

use super::simulate_latency;
use crate::providers::{DisputeRepository, ProviderError};
use crate::types::{BookingId, Dispute, DisputeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory dispute repository.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Clone, Default)]
pub struct InMemoryDisputeRepository {
    disputes: Arc<Mutex<HashMap<DisputeId, Dispute>>>,
    latency: Option<Duration>,
}

impl InMemoryDisputeRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Current stored copy of a dispute
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn get(&self, id: DisputeId) -> Option<Dispute> {
        self.disputes.lock().unwrap().get(&id).cloned()
    }

    /// Every stored dispute raised against `booking_id`
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn for_booking(&self, booking_id: BookingId) -> Vec<Dispute> {
        self.disputes
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.booking_id == booking_id)
            .cloned()
            .collect()
    }
}

impl DisputeRepository for InMemoryDisputeRepository {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn find_by_id(&self, id: DisputeId) -> Result<Option<Dispute>, ProviderError> {
        simulate_latency(self.latency).await;
        Ok(self.disputes.lock().unwrap().get(&id).cloned())
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn save(&self, dispute: &Dispute) -> Result<(), ProviderError> {
        simulate_latency(self.latency).await;
        self.disputes.lock().unwrap().insert(dispute.id, dispute.clone());
        Ok(())
    }
}
