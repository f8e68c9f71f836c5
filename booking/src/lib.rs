//! # Marketplace Booking
//!
//! Booking lifecycle and scheduling-conflict engine for a two-sided services
//! marketplace.
//!
//! The engine:
//!
//! - accepts a booking only if the professional has no overlapping active booking,
//! - moves bookings through a fixed status table, stamping lifecycle timestamps,
//! - notifies the customer when a booking completes, after the change is committed,
//! - splits booking history into active and past views,
//! - lets a dispute workflow settle disputed bookings.
//!
//! Persistence, identity and notification delivery are injected through the
//! traits in [`providers`]; in-memory versions live in `mocks` behind the
//! default `test-utils` feature.
//!
//! ## Example
//!
//! ```ignore
//! let service = BookingService::new(repository, identity, notifications, clock, &Config::from_env());
//! let booking = service.create(request).await?;
//! let booking = service.transition(booking.id, BookingStatus::Confirmed).await?;
//! ```

pub mod config;
pub mod conflict;
pub mod dispatcher;
pub mod dispute;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod locks;
pub mod metrics;
#[cfg(feature = "test-utils")]
pub mod mocks;
pub mod providers;
pub mod service;
pub mod types;

pub use config::{Config, ConfigError, DispatchConfig, DispatchMode, EngineConfig};
pub use conflict::ConflictDetector;
pub use dispatcher::{FailedDelivery, SideEffectDispatcher};
pub use dispute::{DisputeResolution, DisputeWorkflow};
pub use error::{BookingError, EntityKind, ErrorKind, Result};
pub use history::{partition, BookingStatistics, HistoryFilter, Role};
pub use lifecycle::{BookingAction, BookingEnvironment, BookingReducer};
pub use providers::{
    BookingRepository, DisputeRepository, IdentityDirectory, Notification, NotificationKind,
    NotificationSender, ProviderError,
};
pub use service::BookingService;
pub use types::{
    Booking, BookingId, BookingLimits, BookingState, BookingStatus, Cancellation, CustomerId,
    Dispute, DisputeId, DisputeStatus, Money, NewBooking, ProfessionalId, ServiceDetails,
    TimeWindow,
};
