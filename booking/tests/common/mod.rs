//! Shared fixtures for the booking integration tests.

#![allow(dead_code)] // Not every test binary uses every fixture
#![allow(clippy::unwrap_used)]

use chrono::{DateTime, TimeZone, Utc};
use marketplace_booking::mocks::{
    InMemoryBookingRepository, InMemoryDisputeRepository, RecordingNotificationSender,
    StaticIdentityDirectory,
};
use marketplace_booking::{
    Booking, BookingId, BookingService, BookingStatus, Config, CustomerId, DispatchConfig,
    DisputeWorkflow, Money, NewBooking, ProfessionalId, ServiceDetails,
};
use marketplace_core::environment::Clock;
use marketplace_testing::test_clock;
use marketplace_testing::tracing::init_test_tracing;
use std::sync::Arc;
use std::time::Duration;

pub type TestService =
    BookingService<InMemoryBookingRepository, StaticIdentityDirectory, RecordingNotificationSender>;

pub type TestDisputes = DisputeWorkflow<
    InMemoryBookingRepository,
    StaticIdentityDirectory,
    RecordingNotificationSender,
    InMemoryDisputeRepository,
>;

/// Everything a test needs to drive and inspect the engine
pub struct Harness {
    pub service: Arc<TestService>,
    pub repository: InMemoryBookingRepository,
    pub notifications: Arc<RecordingNotificationSender>,
    pub disputes: InMemoryDisputeRepository,
}

impl Harness {
    /// Inline dispatch, fixed clock, no latency
    pub fn new() -> Self {
        Self::with(InMemoryBookingRepository::new(), inline_config())
    }

    pub fn with(repository: InMemoryBookingRepository, config: Config) -> Self {
        Self::with_clock(repository, config, Arc::new(test_clock()))
    }

    pub fn with_clock(
        repository: InMemoryBookingRepository,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        init_test_tracing();
        let notifications = Arc::new(RecordingNotificationSender::new());
        let service = Arc::new(BookingService::new(
            Arc::new(repository.clone()),
            Arc::new(StaticIdentityDirectory::new()),
            Arc::clone(&notifications),
            clock,
            &config,
        ));
        Self {
            service,
            repository,
            notifications,
            disputes: InMemoryDisputeRepository::new(),
        }
    }

    pub fn dispute_workflow(&self) -> TestDisputes {
        DisputeWorkflow::new(Arc::clone(&self.service), Arc::new(self.disputes.clone()))
    }

    /// Store a booking in `status` directly, bypassing the lifecycle
    pub fn seed(&self, status: BookingStatus) -> Booking {
        let mut booking = Booking::new(
            BookingId::new(),
            request(ProfessionalId::new(), at(10, 0), 60),
            test_clock().now(),
        );
        booking.status = status;
        self.repository.insert(booking.clone());
        booking
    }
}

pub fn inline_config() -> Config {
    Config {
        dispatch: DispatchConfig::inline(),
        ..Config::default()
    }
}

pub fn config_with_timeout(timeout: Duration) -> Config {
    let mut config = inline_config();
    config.engine.operation_timeout = timeout;
    config
}

/// 2025-03-10 at `hour:minute` UTC
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

pub fn request(professional_id: ProfessionalId, start: DateTime<Utc>, minutes: u32) -> NewBooking {
    NewBooking {
        customer_id: CustomerId::new(),
        professional_id,
        scheduled_date: start,
        estimated_duration_minutes: minutes,
        details: ServiceDetails {
            category: "plumbing".to_string(),
            address: "221B Baker Street".to_string(),
            description: "Replace kitchen tap".to_string(),
            price: Money::from_cents(9_950),
        },
    }
}

pub fn request_for(
    customer_id: CustomerId,
    professional_id: ProfessionalId,
    start: DateTime<Utc>,
) -> NewBooking {
    NewBooking {
        customer_id,
        ..request(professional_id, start, 30)
    }
}
