//! Conflict detection for a professional's calendar.
//!
//! A proposed window conflicts with an existing booking when both belong to
//! the same professional, the existing booking is active, and the two
//! half-open windows intersect. Inactive bookings never block, whatever
//! window they still store.

use crate::types::{Booking, ProfessionalId, TimeWindow};

/// Stateless overlap check over a set of candidate bookings.
///
/// Candidates are re-filtered by professional and status, so callers may pass
/// whatever they loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    /// The first active booking of `professional_id` overlapping `window`.
    ///
    /// Among several conflicts the one starting earliest is returned, so the
    /// answer does not depend on the order of `candidates`.
    #[must_use]
    pub fn find_conflict<'a>(
        professional_id: ProfessionalId,
        window: &TimeWindow,
        candidates: impl IntoIterator<Item = &'a Booking>,
    ) -> Option<&'a Booking> {
        candidates
            .into_iter()
            .filter(|booking| booking.professional_id == professional_id && booking.is_active())
            .filter(|booking| booking.window().overlaps(window))
            .min_by_key(|booking| (booking.scheduled_date, booking.id))
    }

    /// Whether any active booking of `professional_id` overlaps `window`
    #[must_use]
    pub fn has_conflict<'a>(
        professional_id: ProfessionalId,
        window: &TimeWindow,
        candidates: impl IntoIterator<Item = &'a Booking>,
    ) -> bool {
        Self::find_conflict(professional_id, window, candidates).is_some()
    }
}
