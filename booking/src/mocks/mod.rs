//! In-memory collaborator implementations.
//!
//! Simple implementations of every provider trait for tests and the demo
//! binary. Each can be slowed down with an artificial latency so timeout
//! handling can be exercised.

pub mod dispute;
pub mod identity;
pub mod notification;
pub mod repository;

pub use dispute::InMemoryDisputeRepository;
pub use identity::StaticIdentityDirectory;
pub use notification::RecordingNotificationSender;
pub use repository::InMemoryBookingRepository;

use std::time::Duration;

/// Sleep for the configured latency, if any
async fn simulate_latency(latency: Option<Duration>) {
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
}
