//! Error types for booking operations.

use crate::providers::ProviderError;
use crate::types::{BookingId, BookingStatus, DisputeId, DisputeStatus, ProfessionalId, TimeWindow};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Kind of record a [`BookingError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A booking
    Booking,
    /// A customer account
    Customer,
    /// A professional account
    Professional,
    /// A dispute
    Dispute,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Booking => "booking",
            Self::Customer => "customer",
            Self::Professional => "professional",
            Self::Dispute => "dispute",
        })
    }
}

/// Error taxonomy for the booking engine.
///
/// The first four variants are business-rule outcomes the caller is expected
/// to handle; the rest report infrastructure trouble.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BookingError {
    // ═══════════════════════════════════════════════════════════
    // Business rules
    // ═══════════════════════════════════════════════════════════

    /// Referenced booking, party or dispute does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// What was looked up
        entity: EntityKind,
        /// The id that was looked up
        id: Uuid,
    },

    /// The requested window collides with an active booking of the same professional.
    #[error(
        "professional {professional_id} is already booked for {conflicting_window} \
         (booking {conflicting_booking}); requested {requested}"
    )]
    SchedulingConflict {
        /// Professional being booked
        professional_id: ProfessionalId,
        /// Window that was asked for
        requested: TimeWindow,
        /// Active booking in the way
        conflicting_booking: BookingId,
        /// Window of that booking
        conflicting_window: TimeWindow,
    },

    /// Status change not reachable from the current status.
    #[error("booking {booking_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Booking that was targeted
        booking_id: BookingId,
        /// Status it was in
        from: BookingStatus,
        /// Status that was requested
        to: BookingStatus,
    },

    /// Malformed input, caught before any conflict checking.
    #[error("validation failed: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // Dispute workflow
    // ═══════════════════════════════════════════════════════════

    /// Dispute status change not allowed from the current status.
    #[error("dispute {dispute_id} cannot move from {from} to {to}")]
    InvalidDisputeTransition {
        /// Dispute that was targeted
        dispute_id: DisputeId,
        /// Status it was in
        from: DisputeStatus,
        /// Status that was requested
        to: DisputeStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // Infrastructure
    // ═══════════════════════════════════════════════════════════

    /// A collaborator call did not finish in time. Nothing was written.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Collaborator call that timed out
        operation: &'static str,
        /// Configured limit
        after: Duration,
    },

    /// The booking kept changing underneath every retry.
    #[error("booking {booking_id} was modified concurrently too many times")]
    ConcurrentModification {
        /// Booking that could not be written
        booking_id: BookingId,
    },

    /// A collaborator reported a failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Coarse classification for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing record
    NotFound,
    /// Time slot unavailable
    SchedulingConflict,
    /// Booking or dispute can no longer be changed that way
    InvalidTransition,
    /// Malformed input
    Validation,
    /// Collaborator too slow
    Timeout,
    /// Lost an optimistic concurrency race
    Conflict,
    /// Collaborator failure
    Unavailable,
}

impl ErrorKind {
    /// Label used in metrics and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::SchedulingConflict => "scheduling_conflict",
            Self::InvalidTransition => "invalid_transition",
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
            Self::Unavailable => "unavailable",
        }
    }
}

impl BookingError {
    /// Shorthand for a missing booking
    #[must_use]
    pub const fn booking_not_found(id: BookingId) -> Self {
        Self::NotFound {
            entity: EntityKind::Booking,
            id: *id.as_uuid(),
        }
    }

    /// Shorthand for a missing dispute
    #[must_use]
    pub const fn dispute_not_found(id: DisputeId) -> Self {
        Self::NotFound {
            entity: EntityKind::Dispute,
            id: *id.as_uuid(),
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::SchedulingConflict { .. } => ErrorKind::SchedulingConflict,
            Self::InvalidTransition { .. } | Self::InvalidDisputeTransition { .. } => {
                ErrorKind::InvalidTransition
            },
            Self::Validation(_) => ErrorKind::Validation,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ConcurrentModification { .. }
            | Self::Provider(ProviderError::VersionConflict { .. }) => ErrorKind::Conflict,
            Self::Provider(ProviderError::Unavailable(_)) => ErrorKind::Unavailable,
        }
    }

    /// Whether this is a business-rule outcome rather than an infrastructure failure
    #[must_use]
    pub const fn is_business_rule(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::SchedulingConflict
                | ErrorKind::InvalidTransition
                | ErrorKind::Validation
        )
    }

    /// Text suitable for showing to the end user
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "The requested item could not be found.",
            ErrorKind::SchedulingConflict => "Time slot unavailable.",
            ErrorKind::InvalidTransition => "This booking can no longer be changed.",
            ErrorKind::Validation => "Some of the booking details are invalid.",
            ErrorKind::Timeout | ErrorKind::Conflict | ErrorKind::Unavailable => {
                "Something went wrong on our side. Please try again."
            },
        }
    }
}
