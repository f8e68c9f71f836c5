//! Active/past partitioning of booking history.

use crate::types::{Booking, BookingStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which side of a booking an owner id is matched against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The customer who booked
    Customer,
    /// The professional who was booked
    Professional,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Customer => "customer",
            Self::Professional => "professional",
        })
    }
}

/// History view requested by a list query
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    /// Bookings still on the calendar
    Active,
    /// Finished, called off or disputed bookings
    Past,
    /// No status restriction
    #[default]
    All,
}

impl HistoryFilter {
    /// Statuses this filter admits
    #[must_use]
    pub const fn statuses(self) -> &'static [BookingStatus] {
        match self {
            Self::Active => &BookingStatus::ACTIVE,
            Self::Past => &BookingStatus::PAST,
            Self::All => &BookingStatus::ALL,
        }
    }

    /// Whether a booking in `status` belongs in this view
    #[must_use]
    pub const fn matches(self, status: BookingStatus) -> bool {
        match self {
            Self::Active => status.is_active(),
            Self::Past => !status.is_active(),
            Self::All => true,
        }
    }
}

/// Unknown history filter name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown history filter {0:?}; expected active, past or all")]
pub struct ParseFilterError(pub String);

impl FromStr for HistoryFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "past" => Ok(Self::Past),
            "all" => Ok(Self::All),
            _ => Err(ParseFilterError(s.to_string())),
        }
    }
}

/// Newest first; equal creation times fall back to the booking id.
pub fn sort_newest_first(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Split bookings into `(active, past)`, keeping the input order in each half.
#[must_use]
pub fn partition(bookings: impl IntoIterator<Item = Booking>) -> (Vec<Booking>, Vec<Booking>) {
    bookings.into_iter().partition(Booking::is_active)
}

/// Per-owner booking counts
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BookingStatistics {
    /// Count per status; every status is present
    pub counts: BTreeMap<BookingStatus, usize>,
    /// All bookings
    pub total: usize,
    /// Bookings in an active status
    pub active: usize,
    /// Bookings in a past status
    pub past: usize,
}

impl BookingStatistics {
    /// Tally the given bookings
    #[must_use]
    pub fn from_bookings<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        let mut counts: BTreeMap<BookingStatus, usize> =
            BookingStatus::ALL.into_iter().map(|s| (s, 0)).collect();

        for booking in bookings {
            *counts.entry(booking.status).or_default() += 1;
        }

        let sum_of = |filter: HistoryFilter| -> usize {
            filter
                .statuses()
                .iter()
                .map(|s| counts.get(s).copied().unwrap_or_default())
                .sum()
        };
        let active = sum_of(HistoryFilter::Active);
        let past = sum_of(HistoryFilter::Past);

        Self {
            total: active + past,
            active,
            past,
            counts,
        }
    }

    /// Count for one status
    #[must_use]
    pub fn count(&self, status: BookingStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or_default()
    }
}
