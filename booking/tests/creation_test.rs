//! Booking creation and scheduling-conflict tests.
//!
//! Run with: `cargo test --test creation_test`

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

mod common;

use chrono::Duration;
use common::{at, request, Harness};
use marketplace_booking::mocks::InMemoryBookingRepository;
use marketplace_booking::{BookingError, BookingStatus, ErrorKind, ProfessionalId};
use marketplace_core::environment::Clock;
use marketplace_testing::test_clock;

/// Test 1: Round-trip
///
/// A created booking and its re-fetched copy carry the submitted fields, status `Pending`.
#[tokio::test]
async fn test_created_booking_round_trips() {
    let harness = Harness::new();
    let req = request(ProfessionalId::new(), at(9, 0), 45);

    let created = harness.service.create(req.clone()).await.unwrap();
    let fetched = harness.service.get(created.id).await.unwrap();

    assert_eq!(created, fetched);
    assert_eq!(fetched.status, BookingStatus::Pending);
    assert_eq!(fetched.scheduled_date, req.scheduled_date);
    assert_eq!(fetched.estimated_duration_minutes, 45);
    assert_eq!(fetched.details, req.details);
    assert_eq!(fetched.created_at, test_clock().now());
    assert_eq!(fetched.version, 1);
    assert!(fetched.started_at.is_none());
    assert!(fetched.completed_at.is_none());
    assert!(fetched.cancellation.is_none());
}

/// Test 2: Overlap then adjacency
///
/// A at 10:00-11:00 confirmed; B at 10:30 for 30 minutes conflicts; B at 11:00 succeeds.
#[tokio::test]
async fn test_overlap_conflicts_and_adjacent_slot_succeeds() {
    let harness = Harness::new();
    let pro = ProfessionalId::new();

    let a = harness.service.create(request(pro, at(10, 0), 60)).await.unwrap();
    harness
        .service
        .transition(a.id, BookingStatus::Confirmed)
        .await
        .unwrap();

    let error = harness
        .service
        .create(request(pro, at(10, 30), 30))
        .await
        .unwrap_err();
    match &error {
        BookingError::SchedulingConflict {
            professional_id,
            conflicting_booking,
            conflicting_window,
            ..
        } => {
            assert_eq!(*professional_id, pro);
            assert_eq!(*conflicting_booking, a.id);
            assert_eq!(conflicting_window.start(), at(10, 0));
            assert_eq!(conflicting_window.end(), at(11, 0));
        },
        other => panic!("expected SchedulingConflict, got {other:?}"),
    }
    assert_eq!(error.kind(), ErrorKind::SchedulingConflict);
    assert_eq!(harness.repository.len(), 1);

    let b = harness.service.create(request(pro, at(11, 0), 30)).await.unwrap();
    assert_eq!(b.status, BookingStatus::Pending);
}

/// Test 3: Inactive bookings free the slot
#[tokio::test]
async fn test_cancelled_booking_does_not_block() {
    let harness = Harness::new();
    let pro = ProfessionalId::new();

    let a = harness.service.create(request(pro, at(10, 0), 60)).await.unwrap();
    harness.service.cancel(a.id, "moved").await.unwrap();

    let again = harness.service.create(request(pro, at(10, 0), 60)).await;
    assert!(again.is_ok());
}

/// Test 4: Different professionals never conflict
#[tokio::test]
async fn test_other_professionals_are_independent() {
    let harness = Harness::new();

    harness
        .service
        .create(request(ProfessionalId::new(), at(10, 0), 60))
        .await
        .unwrap();
    let other = harness
        .service
        .create(request(ProfessionalId::new(), at(10, 0), 60))
        .await;

    assert!(other.is_ok());
}

/// Test 5: Malformed input
#[tokio::test]
async fn test_invalid_durations_are_validation_errors() {
    let harness = Harness::new();
    let pro = ProfessionalId::new();

    let zero = harness.service.create(request(pro, at(10, 0), 0)).await;
    let too_long = harness
        .service
        .create(request(pro, at(10, 0), 24 * 60 + 1))
        .await;

    assert!(matches!(zero, Err(BookingError::Validation(_))));
    assert!(matches!(too_long, Err(BookingError::Validation(_))));
    assert!(harness.repository.is_empty());
}

/// Test 6: Concurrent overlapping creations
///
/// Many simultaneous requests for the same slot: exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_creations_admit_exactly_one() {
    let repository = InMemoryBookingRepository::new().with_latency(std::time::Duration::from_millis(2));
    let harness = Harness::with(repository, common::inline_config());
    let pro = ProfessionalId::new();

    let attempts: Vec<_> = (0..10)
        .map(|i| {
            let service = std::sync::Arc::clone(&harness.service);
            tokio::spawn(async move {
                service
                    .create(request(pro, at(10, 0) + Duration::minutes(i), 60))
                    .await
            })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::SchedulingConflict { .. })))
        .count();

    assert_eq!(created, 1);
    assert_eq!(conflicts, 9);
    assert_eq!(harness.repository.len(), 1);
}

/// Test 7: Concurrent creations for different professionals all succeed
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creations_for_different_professionals() {
    let harness = Harness::new();

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let service = std::sync::Arc::clone(&harness.service);
            tokio::spawn(async move {
                service
                    .create(request(ProfessionalId::new(), at(10, 0), 60))
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(attempts).await {
        assert!(result.unwrap().is_ok());
    }
    assert_eq!(harness.repository.len(), 8);
}

/// Test 8: Read-only conflict query
#[tokio::test]
async fn test_has_conflict_matches_creation_outcome() {
    let harness = Harness::new();
    let pro = ProfessionalId::new();
    let a = harness.service.create(request(pro, at(14, 0), 90)).await.unwrap();

    let inside = marketplace_booking::TimeWindow::from_duration(at(15, 0), 15).unwrap();
    let after = marketplace_booking::TimeWindow::from_duration(a.window().end(), 15).unwrap();

    assert!(harness.service.has_conflict(pro, &inside).await.unwrap());
    assert!(!harness.service.has_conflict(pro, &after).await.unwrap());
    assert_eq!(harness.repository.len(), 1);
}
