//! In-memory booking repository.

use super::simulate_latency;
use crate::history::Role;
use crate::providers::{BookingRepository, ProviderError};
use crate::types::{Booking, BookingId, BookingStatus, ProfessionalId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// In-memory booking repository.
///
/// `save` is a compare-and-write under one mutex, so it behaves like a store
/// with row-level optimistic locking.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Clone, Default)]
pub struct InMemoryBookingRepository {
    bookings: Arc<Mutex<HashMap<BookingId, Booking>>>,
    latency: Option<Duration>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryBookingRepository {
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

    /// Make every call fail with `ProviderError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Store a booking directly, bypassing version checks
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn insert(&self, booking: Booking) {
        self.bookings.lock().unwrap().insert(booking.id, booking);
    }

    /// Current stored copy of a booking
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn get(&self, id: BookingId) -> Option<Booking> {
        self.bookings.lock().unwrap().get(&id).cloned()
    }

    /// Number of stored bookings
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn len(&self) -> usize {
        self.bookings.lock().unwrap().len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("booking repository".to_string()));
        }
        Ok(())
    }
}

impl BookingRepository for InMemoryBookingRepository {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>, ProviderError> {
        simulate_latency(self.latency).await;
        self.check_available()?;
        Ok(self.bookings.lock().unwrap().get(&id).cloned())
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn find_active_for_professional(
        &self,
        professional_id: ProfessionalId,
    ) -> Result<Vec<Booking>, ProviderError> {
        simulate_latency(self.latency).await;
        self.check_available()?;
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.professional_id == professional_id && b.is_active())
            .cloned()
            .collect())
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn save(&self, booking: &Booking, expected_version: Option<u64>) -> Result<(), ProviderError> {
        simulate_latency(self.latency).await;
        self.check_available()?;

        let mut store = self.bookings.lock().unwrap();
        let actual = store.get(&booking.id).map(|b| b.version);
        if actual != expected_version {
            return Err(ProviderError::VersionConflict {
                expected: expected_version,
                actual,
            });
        }
        store.insert(booking.id, booking.clone());
        Ok(())
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn query(
        &self,
        owner: Uuid,
        role: Role,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, ProviderError> {
        simulate_latency(self.latency).await;
        self.check_available()?;
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .values()
            .filter(|b| *b.owner(role) == owner && statuses.contains(&b.status))
            .cloned()
            .collect())
    }
}
