//! Business metrics for the booking engine.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the host process.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `bookings_created_total` - Bookings accepted by the creation operation
//! - `booking_conflicts_total` - Creation requests refused for a scheduling conflict
//! - `booking_transitions_total{from,to}` - Committed status changes
//! - `booking_rejected_commands_total{kind}` - Operations that failed, by error kind
//! - `notifications_sent_total` - Notifications delivered
//! - `notification_failures_total` - Notifications that failed or timed out
//! - `dispute_cascades_total{outcome}` - Dispute resolutions by booking-side outcome

use crate::error::BookingError;
use crate::types::BookingStatus;
use metrics::{counter, describe_counter};

/// Counter: bookings created
pub const BOOKINGS_CREATED: &str = "bookings_created_total";
/// Counter: creation requests refused for a conflict
pub const BOOKING_CONFLICTS: &str = "booking_conflicts_total";
/// Counter: committed status transitions
pub const BOOKING_TRANSITIONS: &str = "booking_transitions_total";
/// Counter: failed operations by error kind
pub const BOOKING_REJECTED_COMMANDS: &str = "booking_rejected_commands_total";
/// Counter: notifications delivered
pub const NOTIFICATIONS_SENT: &str = "notifications_sent_total";
/// Counter: notification deliveries that failed
pub const NOTIFICATION_FAILURES: &str = "notification_failures_total";
/// Counter: dispute resolutions by cascade outcome
pub const DISPUTE_CASCADES: &str = "dispute_cascades_total";

/// Initialize and register all metric descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_metrics() {
    describe_counter!(BOOKINGS_CREATED, "Total number of bookings created");
    describe_counter!(
        BOOKING_CONFLICTS,
        "Booking requests rejected because the professional was already booked"
    );
    describe_counter!(
        BOOKING_TRANSITIONS,
        "Committed booking status transitions by source and target status"
    );
    describe_counter!(
        BOOKING_REJECTED_COMMANDS,
        "Booking operations that failed, by error kind"
    );
    describe_counter!(NOTIFICATIONS_SENT, "Notifications delivered successfully");
    describe_counter!(
        NOTIFICATION_FAILURES,
        "Notifications that failed or timed out; the status change stays committed"
    );
    describe_counter!(
        DISPUTE_CASCADES,
        "Dispute resolutions by booking-side outcome (applied, skipped)"
    );
}

/// Record a created booking
pub fn record_created() {
    counter!(BOOKINGS_CREATED).increment(1);
}

/// Record a committed transition
pub fn record_transition(from: BookingStatus, to: BookingStatus) {
    counter!(BOOKING_TRANSITIONS, "from" => from.as_str(), "to" => to.as_str()).increment(1);
}

/// Record a failed operation
pub fn record_rejection(error: &BookingError) {
    if matches!(error, BookingError::SchedulingConflict { .. }) {
        counter!(BOOKING_CONFLICTS).increment(1);
    }
    counter!(BOOKING_REJECTED_COMMANDS, "kind" => error.kind().as_str()).increment(1);
}

/// Record a notification delivery outcome
pub fn record_notification(delivered: bool) {
    if delivered {
        counter!(NOTIFICATIONS_SENT).increment(1);
    } else {
        counter!(NOTIFICATION_FAILURES).increment(1);
    }
}

/// Record what a dispute resolution did to its booking
pub fn record_cascade(applied: bool) {
    let outcome = if applied { "applied" } else { "skipped" };
    counter!(DISPUTE_CASCADES, "outcome" => outcome).increment(1);
}
