//! Notification delivery trait.

use super::ProviderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use uuid::Uuid;

/// Semantic tag of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// The booking is done; the customer is asked to rate the professional
    BookingCompleted,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BookingCompleted => "BOOKING_COMPLETED",
        })
    }
}

/// A message for one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Account the message is addressed to
    pub recipient: Uuid,
    /// What the message is about
    pub kind: NotificationKind,
    /// Opaque payload for the delivery channel
    pub data: serde_json::Value,
}

/// Notification channel.
///
/// This trait abstracts over push, e-mail or in-app delivery.
pub trait NotificationSender: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns error if the channel rejects or cannot accept the message.
    fn send(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;
}
