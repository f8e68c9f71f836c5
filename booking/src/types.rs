//! Domain types for the booking engine.
//!
//! This module contains the identifiers, value objects and records the engine
//! reasons about: the booking record with its status and time window, the
//! opaque service payload, and the dispute record owned by the dispute workflow.

use crate::error::BookingError;
use crate::history::Role;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a booking
    BookingId
);
entity_id!(
    /// Reference to a customer account owned by the identity service
    CustomerId
);
entity_id!(
    /// Reference to a professional account owned by the identity service
    ProfessionalId
);
entity_id!(
    /// Unique identifier for a dispute
    DisputeId
);

// ============================================================================
// Opaque payload
// ============================================================================

/// Money in minor units (cents). Stored and returned, never computed with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// What the customer booked. Carried through the engine untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    /// Service category (e.g. "plumbing")
    pub category: String,
    /// Where the service takes place
    pub address: String,
    /// Free-text description from the customer
    pub description: String,
    /// Agreed price
    pub price: Money,
}

// ============================================================================
// Booking status
// ============================================================================

/// Lifecycle status of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Requested by the customer, awaiting the professional
    Pending,
    /// Accepted by the professional
    Confirmed,
    /// Work has started
    InProgress,
    /// Work finished
    Completed,
    /// Called off before work started
    Cancelled,
    /// Declined by the professional
    Rejected,
    /// A dispute was raised while work was in progress
    Disputed,
    /// The dispute was settled
    Resolved,
}

impl BookingStatus {
    /// Every status, in lifecycle order
    pub const ALL: [Self; 8] = [
        Self::Pending,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::Rejected,
        Self::Disputed,
        Self::Resolved,
    ];

    /// Statuses that occupy the professional's schedule
    pub const ACTIVE: [Self; 3] = [Self::Pending, Self::Confirmed, Self::InProgress];

    /// Statuses shown in the "past" history view
    pub const PAST: [Self; 5] = [
        Self::Completed,
        Self::Cancelled,
        Self::Rejected,
        Self::Disputed,
        Self::Resolved,
    ];

    /// Targets reachable from this status in one step.
    ///
    /// This match is the transition table; it has no wildcard arm so a new
    /// status cannot compile without a decision here.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Rejected, Self::Cancelled],
            Self::Confirmed => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Disputed],
            Self::Disputed => &[Self::Resolved],
            Self::Completed | Self::Cancelled | Self::Rejected | Self::Resolved => &[],
        }
    }

    /// Whether `self → target` is in the transition table
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Whether this status still blocks the professional's calendar
    #[must_use]
    pub const fn is_active(self) -> bool {
        match self {
            Self::Pending | Self::Confirmed | Self::InProgress => true,
            Self::Completed | Self::Cancelled | Self::Rejected | Self::Disputed | Self::Resolved => {
                false
            },
        }
    }

    /// Whether no transition leaves this status
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Wire name, e.g. `IN_PROGRESS`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Rejected => "REJECTED",
            Self::Disputed => "DISPUTED",
            Self::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status: {0:?}")]
pub struct ParseStatusError(pub String);

/// Strips `_`, `-` and spaces so `IN_PROGRESS`, `in-progress` and `InProgress` compare equal.
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FromStr for BookingStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(s.trim());
        Self::ALL
            .into_iter()
            .find(|status| normalize_name(status.as_str()) == wanted)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

// ============================================================================
// Time window
// ============================================================================

/// Half-open interval `[start, end)` occupied by a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window between two instants; `None` unless `start < end`
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Window starting at `start` and lasting `minutes`.
    ///
    /// `None` for a zero duration or when the end is not representable.
    #[must_use]
    pub fn from_duration(start: DateTime<Utc>, minutes: u32) -> Option<Self> {
        let end = start.checked_add_signed(Duration::minutes(i64::from(minutes)))?;
        Self::new(start, end)
    }

    /// Inclusive start
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the window
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Non-empty intersection. Windows that only touch do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

// ============================================================================
// Booking record
// ============================================================================

/// Why and when a booking was cancelled. The two always travel together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    /// Reason as supplied, verbatim
    pub reason: String,
    /// When the cancellation was recorded
    pub cancelled_at: DateTime<Utc>,
}

/// Upper bounds applied to creation requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookingLimits {
    /// Longest accepted `estimated_duration_minutes`
    pub max_duration_minutes: u32,
}

impl Default for BookingLimits {
    fn default() -> Self {
        Self {
            max_duration_minutes: 24 * 60,
        }
    }
}

/// Creation request for a booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    /// Customer placing the booking
    pub customer_id: CustomerId,
    /// Professional being booked
    pub professional_id: ProfessionalId,
    /// Start of the service
    pub scheduled_date: DateTime<Utc>,
    /// Expected length of the service
    pub estimated_duration_minutes: u32,
    /// Opaque service payload
    pub details: ServiceDetails,
}

impl NewBooking {
    /// Check the request's shape and compute the window it asks for
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for a zero duration, a duration
    /// above `limits.max_duration_minutes`, or a window whose end cannot be
    /// represented.
    pub fn validate(&self, limits: &BookingLimits) -> Result<TimeWindow, BookingError> {
        if self.estimated_duration_minutes == 0 {
            return Err(BookingError::Validation(
                "estimated duration must be greater than zero".to_string(),
            ));
        }

        if self.estimated_duration_minutes > limits.max_duration_minutes {
            return Err(BookingError::Validation(format!(
                "estimated duration of {} minutes exceeds the limit of {} minutes",
                self.estimated_duration_minutes, limits.max_duration_minutes
            )));
        }

        TimeWindow::from_duration(self.scheduled_date, self.estimated_duration_minutes).ok_or_else(
            || BookingError::Validation("scheduled window is out of range".to_string()),
        )
    }
}

/// A service booking between a customer and a professional
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Customer who booked
    pub customer_id: CustomerId,
    /// Professional who was booked
    pub professional_id: ProfessionalId,
    /// Start of the service
    pub scheduled_date: DateTime<Utc>,
    /// Expected length of the service
    pub estimated_duration_minutes: u32,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// Opaque service payload
    pub details: ServiceDetails,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// Set on `InProgress`
    pub started_at: Option<DateTime<Utc>>,
    /// Set on `Completed`
    pub completed_at: Option<DateTime<Utc>>,
    /// Set on `Cancelled`
    pub cancellation: Option<Cancellation>,
    /// Record version for optimistic concurrency; 1 after creation
    pub version: u64,
}

impl Booking {
    /// Build the initial `Pending` record for a validated request
    #[must_use]
    pub fn new(id: BookingId, request: NewBooking, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id: request.customer_id,
            professional_id: request.professional_id,
            scheduled_date: request.scheduled_date,
            estimated_duration_minutes: request.estimated_duration_minutes,
            status: BookingStatus::Pending,
            details: request.details,
            created_at,
            started_at: None,
            completed_at: None,
            cancellation: None,
            version: 1,
        }
    }

    /// The interval this booking occupies
    #[must_use]
    pub fn window(&self) -> TimeWindow {
        // Creation validated the window, so the fallback only guards hand-built records.
        let end = self
            .scheduled_date
            .checked_add_signed(Duration::minutes(i64::from(self.estimated_duration_minutes)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        TimeWindow {
            start: self.scheduled_date,
            end,
        }
    }

    /// Whether the booking still blocks the professional's calendar
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// When the booking was cancelled, if it was
    #[must_use]
    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancellation.as_ref().map(|c| c.cancelled_at)
    }

    /// Why the booking was cancelled, if it was
    #[must_use]
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation.as_ref().map(|c| c.reason.as_str())
    }

    /// The party id on the given side of the booking
    #[must_use]
    pub const fn owner(&self, role: Role) -> &Uuid {
        match role {
            Role::Customer => self.customer_id.as_uuid(),
            Role::Professional => self.professional_id.as_uuid(),
        }
    }
}

// ============================================================================
// Reducer state
// ============================================================================

/// Bookings loaded for the request being processed
#[derive(Clone, Debug, Default)]
pub struct BookingState {
    /// Loaded bookings by ID
    pub bookings: HashMap<BookingId, Booking>,
    /// Rejection recorded by the last command, if any
    pub last_error: Option<BookingError>,
}

impl BookingState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State holding a single booking
    #[must_use]
    pub fn with_booking(booking: Booking) -> Self {
        Self::with_bookings([booking])
    }

    /// State holding the given bookings
    #[must_use]
    pub fn with_bookings(bookings: impl IntoIterator<Item = Booking>) -> Self {
        Self {
            bookings: bookings.into_iter().map(|b| (b.id, b)).collect(),
            last_error: None,
        }
    }

    /// Look up a loaded booking
    #[must_use]
    pub fn get(&self, id: &BookingId) -> Option<&Booking> {
        self.bookings.get(id)
    }

    /// Whether a booking is loaded
    #[must_use]
    pub fn exists(&self, id: &BookingId) -> bool {
        self.bookings.contains_key(id)
    }

    /// Number of loaded bookings
    #[must_use]
    pub fn count(&self) -> usize {
        self.bookings.len()
    }

    /// Remove and return the recorded rejection
    pub fn take_error(&mut self) -> Option<BookingError> {
        self.last_error.take()
    }
}

// ============================================================================
// Dispute record
// ============================================================================

/// Status of a dispute, owned by the dispute workflow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    /// Raised, not yet picked up
    Open,
    /// Staff are looking at it
    InReview,
    /// A resolution was recorded
    Resolved,
    /// Archived
    Closed,
}

impl DisputeStatus {
    /// Targets reachable from this status in one step
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Open => &[Self::InReview, Self::Resolved, Self::Closed],
            Self::InReview => &[Self::Resolved, Self::Closed],
            Self::Resolved => &[Self::Closed],
            Self::Closed => &[],
        }
    }

    /// Whether `self → target` is allowed
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Wire name, e.g. `IN_REVIEW`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InReview => "IN_REVIEW",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispute raised against one booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    /// Dispute ID
    pub id: DisputeId,
    /// The disputed booking
    pub booking_id: BookingId,
    /// Current status
    pub status: DisputeStatus,
    /// Why the dispute was raised
    pub reason: String,
    /// Outcome text, once resolved
    pub resolution: Option<String>,
    /// When the dispute was raised
    pub opened_at: DateTime<Utc>,
    /// When a resolution was recorded
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the dispute was closed
    pub closed_at: Option<DateTime<Utc>>,
}

impl Dispute {
    /// A freshly opened dispute
    #[must_use]
    pub fn open(
        id: DisputeId,
        booking_id: BookingId,
        reason: String,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            booking_id,
            status: DisputeStatus::Open,
            reason,
            resolution: None,
            opened_at,
            resolved_at: None,
            closed_at: None,
        }
    }
}
