//! Booking persistence trait.

use super::ProviderError;
use crate::history::Role;
use crate::types::{Booking, BookingId, BookingStatus, ProfessionalId};
use std::future::Future;
use uuid::Uuid;

/// Booking repository.
///
/// Abstracts over wherever booking records live. Implementations must make
/// [`save`](Self::save) a single atomic compare-and-write.
pub trait BookingRepository: Send + Sync {
    /// Load one booking.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached. A missing booking is `Ok(None)`.
    fn find_by_id(
        &self,
        id: BookingId,
    ) -> impl Future<Output = Result<Option<Booking>, ProviderError>> + Send;

    /// Load every booking of a professional whose status is active.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn find_active_for_professional(
        &self,
        professional_id: ProfessionalId,
    ) -> impl Future<Output = Result<Vec<Booking>, ProviderError>> + Send;

    /// Insert or update a booking.
    ///
    /// `expected_version` is `None` for an insert (the id must be unused) and
    /// `Some(v)` for an update (the stored record must be at version `v`).
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The stored version differs → `ProviderError::VersionConflict`
    /// - The store cannot be reached
    fn save(
        &self,
        booking: &Booking,
        expected_version: Option<u64>,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Bookings where `owner` is on the `role` side, restricted to `statuses`.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn query(
        &self,
        owner: Uuid,
        role: Role,
        statuses: &[BookingStatus],
    ) -> impl Future<Output = Result<Vec<Booking>, ProviderError>> + Send;
}
