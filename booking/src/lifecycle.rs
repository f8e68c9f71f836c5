//! Booking lifecycle state machine.
//!
//! [`BookingReducer`] validates commands against the bookings loaded into
//! [`BookingState`], turns accepted commands into events, applies those events
//! and returns them as [`Effect::Publish`] descriptions. The caller persists the
//! changed record first and only then hands the published events on to the
//! [`SideEffectDispatcher`](crate::dispatcher::SideEffectDispatcher).
//!
//! Events fed straight into the reducer are applied without further checks
//! and without effects, which is how a stored event history is replayed.

use crate::conflict::ConflictDetector;
use crate::error::BookingError;
use crate::types::{
    Booking, BookingId, BookingLimits, BookingState, BookingStatus, Cancellation, CustomerId,
    NewBooking, ProfessionalId,
};
use chrono::{DateTime, Utc};
use marketplace_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the booking lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BookingAction {
    // Commands
    /// Create a booking in `Pending`, provided the professional is free
    PlaceBooking {
        /// ID to give the new booking
        booking_id: BookingId,
        /// What was requested
        request: NewBooking,
    },

    /// Move a booking to another status through the transition table
    TransitionStatus {
        /// Booking to change
        booking_id: BookingId,
        /// Requested status
        target: BookingStatus,
    },

    /// Cancel a `Pending` or `Confirmed` booking with a reason
    CancelBooking {
        /// Booking to cancel
        booking_id: BookingId,
        /// Free-text reason, stored verbatim
        reason: String,
    },

    // Events
    /// A booking was created
    BookingPlaced {
        /// The new record
        booking: Booking,
    },

    /// A booking changed status; completion and cancellation have their own events
    StatusChanged {
        /// Booking that changed
        booking_id: BookingId,
        /// Previous status
        from: BookingStatus,
        /// New status
        to: BookingStatus,
        /// When the change was recorded
        at: DateTime<Utc>,
    },

    /// A booking was completed
    BookingCompleted {
        /// Booking that completed
        booking_id: BookingId,
        /// Customer to ask for a rating
        customer_id: CustomerId,
        /// Professional who did the work
        professional_id: ProfessionalId,
        /// Copied from the service payload for the notification
        service_category: String,
        /// Completion time
        completed_at: DateTime<Utc>,
    },

    /// A booking was cancelled
    BookingCancelled {
        /// Booking that was cancelled
        booking_id: BookingId,
        /// Status it was cancelled from
        from: BookingStatus,
        /// Reason as supplied
        reason: String,
        /// Cancellation time
        cancelled_at: DateTime<Utc>,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the booking reducer
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Source of lifecycle timestamps
    pub clock: Arc<dyn Clock>,
    /// Bounds applied to creation requests
    pub limits: BookingLimits,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, limits: BookingLimits) -> Self {
        Self { clock, limits }
    }

    /// Current time, never earlier than `created_at`.
    ///
    /// A clock running behind the one that stamped the booking would
    /// otherwise produce `cancelled_at < created_at`.
    fn stamp(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        self.clock.now().max(created_at)
    }
}

impl std::fmt::Debug for BookingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEnvironment")
            .field("now", &self.clock.now())
            .field("limits", &self.limits)
            .finish()
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer enforcing the booking transition table
#[derive(Clone, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_place(
        state: &BookingState,
        booking_id: BookingId,
        request: &NewBooking,
        limits: &BookingLimits,
    ) -> Result<(), BookingError> {
        let window = request.validate(limits)?;

        if state.exists(&booking_id) {
            return Err(BookingError::Validation(format!(
                "booking {booking_id} already exists"
            )));
        }

        if let Some(existing) =
            ConflictDetector::find_conflict(request.professional_id, &window, state.bookings.values())
        {
            tracing::debug!(
                professional_id = %request.professional_id,
                requested = %window,
                conflicting_booking = %existing.id,
                "scheduling conflict"
            );
            return Err(BookingError::SchedulingConflict {
                professional_id: request.professional_id,
                requested: window,
                conflicting_booking: existing.id,
                conflicting_window: existing.window(),
            });
        }

        Ok(())
    }

    fn validate_transition<'a>(
        state: &'a BookingState,
        booking_id: BookingId,
        target: BookingStatus,
    ) -> Result<&'a Booking, BookingError> {
        let booking = state
            .get(&booking_id)
            .ok_or(BookingError::booking_not_found(booking_id))?;

        if !booking.status.can_transition_to(target) {
            return Err(BookingError::InvalidTransition {
                booking_id,
                from: booking.status,
                to: target,
            });
        }

        Ok(booking)
    }

    /// Event recording `booking` moving to `target` at `at`
    fn transition_event(
        booking: &Booking,
        target: BookingStatus,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> BookingAction {
        match target {
            BookingStatus::Completed => BookingAction::BookingCompleted {
                booking_id: booking.id,
                customer_id: booking.customer_id,
                professional_id: booking.professional_id,
                service_category: booking.details.category.clone(),
                completed_at: at,
            },
            BookingStatus::Cancelled => BookingAction::BookingCancelled {
                booking_id: booking.id,
                from: booking.status,
                reason: reason.unwrap_or_default(),
                cancelled_at: at,
            },
            BookingStatus::Pending
            | BookingStatus::Confirmed
            | BookingStatus::InProgress
            | BookingStatus::Rejected
            | BookingStatus::Disputed
            | BookingStatus::Resolved => BookingAction::StatusChanged {
                booking_id: booking.id,
                from: booking.status,
                to: target,
                at,
            },
        }
    }

    fn reject(state: &mut BookingState, error: BookingError) -> SmallVec<[Effect<BookingAction>; 4]> {
        tracing::debug!(kind = error.kind().as_str(), %error, "command rejected");
        state.last_error = Some(error);
        SmallVec::new()
    }

    /// Apply an event to state
    fn apply_event(state: &mut BookingState, event: &BookingAction) {
        match event {
            BookingAction::BookingPlaced { booking } => {
                state.bookings.insert(booking.id, booking.clone());
            },
            BookingAction::StatusChanged {
                booking_id, to, at, ..
            } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.status = *to;
                    if *to == BookingStatus::InProgress {
                        booking.started_at = Some(*at);
                    }
                    booking.version += 1;
                }
            },
            BookingAction::BookingCompleted {
                booking_id,
                completed_at,
                ..
            } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.status = BookingStatus::Completed;
                    booking.completed_at = Some(*completed_at);
                    booking.version += 1;
                }
            },
            BookingAction::BookingCancelled {
                booking_id,
                reason,
                cancelled_at,
                ..
            } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.status = BookingStatus::Cancelled;
                    booking.cancellation = Some(Cancellation {
                        reason: reason.clone(),
                        cancelled_at: *cancelled_at,
                    });
                    booking.version += 1;
                }
            },
            // Commands don't modify state
            BookingAction::PlaceBooking { .. }
            | BookingAction::TransitionStatus { .. }
            | BookingAction::CancelBooking { .. } => {},
        }
        state.last_error = None;
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            BookingAction::PlaceBooking {
                booking_id,
                request,
            } => {
                if let Err(error) = Self::validate_place(state, booking_id, &request, &env.limits) {
                    return Self::reject(state, error);
                }

                let booking = Booking::new(booking_id, request, env.clock.now());
                let event = BookingAction::BookingPlaced { booking };
                Self::apply_event(state, &event);

                smallvec![Effect::Publish(event)]
            },

            BookingAction::TransitionStatus { booking_id, target } => {
                let event = match Self::validate_transition(state, booking_id, target) {
                    Ok(booking) => {
                        let at = env.stamp(booking.created_at);
                        Self::transition_event(booking, target, None, at)
                    },
                    Err(error) => return Self::reject(state, error),
                };
                Self::apply_event(state, &event);

                smallvec![Effect::Publish(event)]
            },

            BookingAction::CancelBooking { booking_id, reason } => {
                let event =
                    match Self::validate_transition(state, booking_id, BookingStatus::Cancelled) {
                        Ok(booking) => {
                            let at = env.stamp(booking.created_at);
                            Self::transition_event(
                                booking,
                                BookingStatus::Cancelled,
                                Some(reason),
                                at,
                            )
                        },
                        Err(error) => return Self::reject(state, error),
                    };
                Self::apply_event(state, &event);

                smallvec![Effect::Publish(event)]
            },

            // ========== Events (replay) ==========
            event @ (BookingAction::BookingPlaced { .. }
            | BookingAction::StatusChanged { .. }
            | BookingAction::BookingCompleted { .. }
            | BookingAction::BookingCancelled { .. }) => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}
