//! Post-commit side effects.
//!
//! The dispatcher receives the events a committed operation published and
//! turns the ones that matter to other parties into notifications. It fails
//! independently of the operation: a slow or broken notification channel is
//! logged, counted and dead-lettered, and never reaches the caller.

use crate::config::{DispatchConfig, DispatchMode};
use crate::lifecycle::BookingAction;
use crate::metrics;
use crate::providers::{Notification, NotificationKind, NotificationSender};
use chrono::{DateTime, Utc};
use marketplace_core::environment::Clock;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A notification that could not be delivered
#[derive(Debug, Clone, PartialEq)]
pub struct FailedDelivery {
    /// What was being sent
    pub notification: Notification,
    /// Why delivery failed
    pub error: String,
    /// When delivery was given up
    pub failed_at: DateTime<Utc>,
}

/// Bounded FIFO of failed deliveries; the oldest entry goes when full.
#[derive(Debug)]
struct DeadLetters {
    entries: VecDeque<FailedDelivery>,
    capacity: usize,
}

impl DeadLetters {
    fn push(&mut self, entry: FailedDelivery) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            tracing::warn!(capacity = self.capacity, "dead letter list full, dropping oldest entry");
        }
        self.entries.push_back(entry);
    }
}

/// Maps committed booking events to notifications and delivers them
pub struct SideEffectDispatcher<N> {
    sender: Arc<N>,
    clock: Arc<dyn Clock>,
    mode: DispatchMode,
    timeout: Duration,
    dead_letters: Arc<Mutex<DeadLetters>>,
}

impl<N> SideEffectDispatcher<N>
where
    N: NotificationSender + 'static,
{
    /// Creates a dispatcher delivering through `sender`.
    ///
    /// `clock` stamps dead-lettered deliveries.
    #[must_use]
    pub fn new(sender: Arc<N>, clock: Arc<dyn Clock>, config: &DispatchConfig) -> Self {
        Self {
            sender,
            clock,
            mode: config.mode,
            timeout: config.timeout,
            dead_letters: Arc::new(Mutex::new(DeadLetters {
                entries: VecDeque::new(),
                capacity: config.dead_letter_capacity,
            })),
        }
    }

    /// Notification owed for a committed event, if any.
    ///
    /// Only completion notifies anyone: the customer is asked to rate the
    /// professional.
    #[must_use]
    pub fn notification_for(event: &BookingAction) -> Option<Notification> {
        match event {
            BookingAction::BookingCompleted {
                booking_id,
                customer_id,
                professional_id,
                service_category,
                ..
            } => Some(Notification {
                recipient: *customer_id.as_uuid(),
                kind: NotificationKind::BookingCompleted,
                data: json!({
                    "bookingId": booking_id,
                    "professionalId": professional_id,
                    "serviceCategory": service_category,
                }),
            }),
            BookingAction::BookingPlaced { .. }
            | BookingAction::StatusChanged { .. }
            | BookingAction::BookingCancelled { .. }
            | BookingAction::PlaceBooking { .. }
            | BookingAction::TransitionStatus { .. }
            | BookingAction::CancelBooking { .. } => None,
        }
    }

    /// Deliver whatever the committed `events` call for.
    ///
    /// Returns the number of notifications handed to the channel. In detached
    /// mode they may still be in flight when this returns.
    pub async fn dispatch(&self, events: impl IntoIterator<Item = BookingAction>) -> usize {
        let mut dispatched = 0;

        for notification in events.into_iter().filter_map(|e| Self::notification_for(&e)) {
            dispatched += 1;
            let sender = Arc::clone(&self.sender);
            let clock = Arc::clone(&self.clock);
            let dead_letters = Arc::clone(&self.dead_letters);
            let timeout = self.timeout;

            match (self.mode, tokio::runtime::Handle::try_current()) {
                (DispatchMode::Detached, Ok(handle)) => {
                    handle.spawn(async move {
                        deliver(sender.as_ref(), clock.as_ref(), notification, timeout, &dead_letters)
                            .await;
                    });
                },
                _ => {
                    deliver(sender.as_ref(), clock.as_ref(), notification, timeout, &dead_letters)
                        .await;
                },
            }
        }

        dispatched
    }

    /// Failed deliveries currently retained, oldest first
    #[must_use]
    pub fn failed_deliveries(&self) -> Vec<FailedDelivery> {
        self.dead_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .cloned()
            .collect()
    }

    /// Remove and return every retained failed delivery
    pub fn drain_failed(&self) -> Vec<FailedDelivery> {
        self.dead_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .drain(..)
            .collect()
    }
}

impl<N> std::fmt::Debug for SideEffectDispatcher<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffectDispatcher")
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

async fn deliver<N: NotificationSender>(
    sender: &N,
    clock: &dyn Clock,
    notification: Notification,
    timeout: Duration,
    dead_letters: &Mutex<DeadLetters>,
) {
    let outcome = match tokio::time::timeout(timeout, sender.send(notification.clone())).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(error.to_string()),
        Err(_) => Err(format!("timed out after {timeout:?}")),
    };

    match outcome {
        Ok(()) => {
            metrics::record_notification(true);
            tracing::info!(
                recipient = %notification.recipient,
                kind = %notification.kind,
                "notification sent"
            );
        },
        Err(error) => {
            metrics::record_notification(false);
            tracing::warn!(
                recipient = %notification.recipient,
                kind = %notification.kind,
                %error,
                "notification failed; status change stays committed"
            );
            dead_letters
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(FailedDelivery {
                    notification,
                    error,
                    failed_at: clock.now(),
                });
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::RecordingNotificationSender;
    use crate::types::{BookingId, BookingStatus, CustomerId, ProfessionalId};
    use marketplace_testing::test_clock;

    fn completed(customer_id: CustomerId) -> BookingAction {
        BookingAction::BookingCompleted {
            booking_id: BookingId::new(),
            customer_id,
            professional_id: ProfessionalId::new(),
            service_category: "cleaning".to_string(),
            completed_at: Utc::now(),
        }
    }

    fn inline(capacity: usize) -> DispatchConfig {
        DispatchConfig {
            dead_letter_capacity: capacity,
            ..DispatchConfig::inline()
        }
    }

    #[tokio::test]
    async fn test_completion_notifies_customer_once() {
        let sender = Arc::new(RecordingNotificationSender::new());
        let dispatcher = SideEffectDispatcher::new(Arc::clone(&sender), Arc::new(test_clock()), &inline(10));
        let customer_id = CustomerId::new();

        let count = dispatcher.dispatch([completed(customer_id)]).await;

        assert_eq!(count, 1);
        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, *customer_id.as_uuid());
        assert_eq!(sent[0].kind, NotificationKind::BookingCompleted);
        assert_eq!(sent[0].data["serviceCategory"], "cleaning");
    }

    #[tokio::test]
    async fn test_other_events_do_not_notify() {
        let sender = Arc::new(RecordingNotificationSender::new());
        let dispatcher = SideEffectDispatcher::new(Arc::clone(&sender), Arc::new(test_clock()), &inline(10));

        let count = dispatcher
            .dispatch([BookingAction::StatusChanged {
                booking_id: BookingId::new(),
                from: BookingStatus::Pending,
                to: BookingStatus::Confirmed,
                at: Utc::now(),
            }])
            .await;

        assert_eq!(count, 0);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_dead_lettered_and_bounded() {
        let sender = Arc::new(RecordingNotificationSender::new());
        sender.set_failing(true);
        let dispatcher = SideEffectDispatcher::new(Arc::clone(&sender), Arc::new(test_clock()), &inline(2));

        let first = CustomerId::new();
        dispatcher
            .dispatch([completed(first), completed(CustomerId::new()), completed(CustomerId::new())])
            .await;

        let failed = dispatcher.failed_deliveries();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|f| f.notification.recipient != *first.as_uuid()));
        assert!(failed.iter().all(|f| f.failed_at == test_clock().now()));

        assert_eq!(dispatcher.drain_failed().len(), 2);
        assert!(dispatcher.failed_deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_slow_channel_times_out_into_dead_letters() {
        let sender = Arc::new(RecordingNotificationSender::new().with_latency(Duration::from_millis(200)));
        let config = DispatchConfig {
            timeout: Duration::from_millis(20),
            ..inline(10)
        };
        let dispatcher = SideEffectDispatcher::new(Arc::clone(&sender), Arc::new(test_clock()), &config);

        dispatcher.dispatch([completed(CustomerId::new())]).await;

        let failed = dispatcher.failed_deliveries();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].error.contains("timed out"));
        assert!(sender.sent().is_empty());
    }
}
