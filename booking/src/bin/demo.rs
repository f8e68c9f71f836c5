//! Booking Engine Demo
//!
//! Runs the booking engine end to end against the in-memory collaborators:
//! - Conflict detection for overlapping requests
//! - Confirm → start → complete, with the rating request notification
//! - Cancellation with a reason, and a rejected second cancellation
//! - A dispute raised, resolved and cascaded onto the booking
//! - Active/past history and per-status statistics
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin booking-demo
//! ```

use anyhow::Context;
use chrono::{Duration, Utc};
use marketplace_booking::mocks::{
    InMemoryBookingRepository, InMemoryDisputeRepository, RecordingNotificationSender,
    StaticIdentityDirectory,
};
use marketplace_booking::{
    metrics::register_metrics, BookingService, BookingStatus, Config, CustomerId, DispatchMode,
    DisputeWorkflow, HistoryFilter, Money, NewBooking, ProfessionalId, Role, ServiceDetails,
};
use marketplace_core::environment::SystemClock;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .context("invalid RUST_LOG filter")?,
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    register_metrics();

    // Deliveries are awaited so the output below is in order.
    config.dispatch.mode = DispatchMode::Inline;
    config.validate().context("invalid configuration")?;

    let notifications = Arc::new(RecordingNotificationSender::new());
    let service = Arc::new(BookingService::new(
        Arc::new(InMemoryBookingRepository::new()),
        Arc::new(StaticIdentityDirectory::new()),
        Arc::clone(&notifications),
        Arc::new(SystemClock),
        &config,
    ));
    let disputes = DisputeWorkflow::new(Arc::clone(&service), Arc::new(InMemoryDisputeRepository::new()));

    println!("\n============================================");
    println!("   Booking Engine - Live Demo");
    println!("============================================\n");

    let professional = ProfessionalId::new();
    let customer = CustomerId::new();
    let tomorrow_ten = (Utc::now() + Duration::days(1))
        .date_naive()
        .and_hms_opt(10, 0, 0)
        .context("10:00 is a valid time")?
        .and_utc();

    let request = |start, minutes, category: &str| NewBooking {
        customer_id: customer,
        professional_id: professional,
        scheduled_date: start,
        estimated_duration_minutes: minutes,
        details: ServiceDetails {
            category: category.to_string(),
            address: "12 Harbour Road".to_string(),
            description: "Demo booking".to_string(),
            price: Money::from_cents(8_000),
        },
    };

    // Step 1: book 10:00-11:00 and confirm it
    println!("1. Booking 10:00-11:00 and confirming...");
    let first = service.create(request(tomorrow_ten, 60, "plumbing")).await?;
    let first = service.transition(first.id, BookingStatus::Confirmed).await?;
    println!("   {} is {}\n", first.id, first.status);

    // Step 2: an overlapping request is refused, an adjacent one accepted
    println!("2. Requesting 10:30 for 30 minutes...");
    match service
        .create(request(tomorrow_ten + Duration::minutes(30), 30, "plumbing"))
        .await
    {
        Ok(booking) => println!("   unexpectedly accepted {}", booking.id),
        Err(error) => println!("   refused: {error} ({})", error.user_message()),
    }
    println!("   Requesting 11:00 for 30 minutes...");
    let second = service
        .create(request(tomorrow_ten + Duration::minutes(60), 30, "electrical"))
        .await?;
    println!("   accepted {}\n", second.id);

    // Step 3: cancel, then try again
    println!("3. Cancelling the 11:00 booking...");
    let cancelled = service.cancel(second.id, "Schedule conflict").await?;
    println!(
        "   {} with reason {:?}",
        cancelled.status,
        cancelled.cancellation_reason().unwrap_or_default()
    );
    if let Err(error) = service.cancel(second.id, "again").await {
        println!("   second cancel refused: {error}\n");
    }

    // Step 4: run the first booking to completion
    println!("4. Starting and completing the 10:00 booking...");
    service.transition(first.id, BookingStatus::InProgress).await?;
    let completed = service.transition(first.id, BookingStatus::Completed).await?;
    println!("   {} at {:?}", completed.status, completed.completed_at);
    for notification in notifications.sent() {
        println!("   notification {} -> {}", notification.kind, notification.recipient);
    }
    println!();

    // Step 5: a disputed booking settled by the dispute workflow
    println!("5. Disputing a third booking...");
    let third = service
        .create(request(tomorrow_ten + Duration::hours(3), 90, "carpentry"))
        .await?;
    service.transition(third.id, BookingStatus::Confirmed).await?;
    service.transition(third.id, BookingStatus::InProgress).await?;
    let dispute = disputes.open(third.id, "Work not as described").await?;
    disputes.begin_review(dispute.id).await?;
    let outcome = disputes.resolve(dispute.id, "Partial refund agreed").await?;
    println!(
        "   dispute {} -> booking {} (cascade applied: {})\n",
        outcome.dispute.status, outcome.booking.status, outcome.cascade_applied
    );

    // Step 6: history views
    println!("6. Customer history...");
    for filter in [HistoryFilter::Active, HistoryFilter::Past, HistoryFilter::All] {
        let bookings = service
            .list_bookings(*customer.as_uuid(), Role::Customer, filter)
            .await?;
        println!("   {filter:?}: {} booking(s)", bookings.len());
    }
    let stats = service.statistics(*customer.as_uuid(), Role::Customer).await?;
    println!(
        "   total {} = active {} + past {}",
        stats.total, stats.active, stats.past
    );

    println!("\n============================================");
    println!("   Demo complete");
    println!("============================================\n");

    Ok(())
}
