//! Recording notification sender.

use super::simulate_latency;
use crate::providers::{Notification, NotificationKind, NotificationSender, ProviderError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Notification sender that keeps what it was given.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Clone, Default)]
pub struct RecordingNotificationSender {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl RecordingNotificationSender {
    /// Create a sender that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every delivery by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make deliveries fail with `ProviderError::Unavailable`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything delivered so far, in delivery order
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Deliveries of one kind
    #[must_use]
    pub fn sent_of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.sent().into_iter().filter(|n| n.kind == kind).collect()
    }
}

impl NotificationSender for RecordingNotificationSender {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn send(&self, notification: Notification) -> Result<(), ProviderError> {
        simulate_latency(self.latency).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("notification channel".to_string()));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}
