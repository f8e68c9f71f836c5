//! Collaborator traits consumed by the engine.
//!
//! The engine never talks to a database, an identity service or a push
//! gateway directly. It is handed implementations of these traits, which
//! keeps the business rules testable against the in-memory versions in
//! [`crate::mocks`].

mod dispute;
mod identity;
mod notification;
mod repository;

pub use dispute::DisputeRepository;
pub use identity::IdentityDirectory;
pub use notification::{Notification, NotificationKind, NotificationSender};
pub use repository::BookingRepository;

use thiserror::Error;

/// Failure reported by a collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// An optimistic write found a different version than it expected.
    ///
    /// `expected: None` means the write required the record to be absent.
    #[error("version conflict: expected {expected:?}, found {actual:?}")]
    VersionConflict {
        /// Version the writer based its change on
        expected: Option<u64>,
        /// Version actually stored
        actual: Option<u64>,
    },

    /// The collaborator could not serve the request.
    #[error("{0} unavailable")]
    Unavailable(String),
}
