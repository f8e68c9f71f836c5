//! Dispute workflow and resolution cascade tests.
//!
//! Run with: `cargo test --test dispute_test`

#![allow(clippy::unwrap_used)]

mod common;

use common::{config_with_timeout, Harness};
use marketplace_booking::mocks::{InMemoryBookingRepository, InMemoryDisputeRepository};
use marketplace_booking::{
    BookingError, BookingStatus, Dispute, DisputeId, DisputeRepository, DisputeStatus, DisputeWorkflow,
    ErrorKind, ProviderError,
};
use std::sync::Arc;
use std::time::Duration;

/// Test 1: Open, review, resolve cascades the booking to Resolved
#[tokio::test]
async fn test_resolution_cascades_disputed_booking() {
    let harness = Harness::new();
    let workflow = harness.dispute_workflow();
    let seeded = harness.seed(BookingStatus::InProgress);

    let dispute = workflow.open(seeded.id, "Work not finished").await.unwrap();
    assert_eq!(dispute.status, DisputeStatus::Open);
    assert_eq!(
        harness.repository.get(seeded.id).unwrap().status,
        BookingStatus::Disputed
    );

    let reviewing = workflow.begin_review(dispute.id).await.unwrap();
    assert_eq!(reviewing.status, DisputeStatus::InReview);

    let outcome = workflow.resolve(dispute.id, "Refund issued").await.unwrap();
    assert!(outcome.cascade_applied);
    assert_eq!(outcome.dispute.status, DisputeStatus::Resolved);
    assert_eq!(outcome.dispute.resolution.as_deref(), Some("Refund issued"));
    assert!(outcome.dispute.resolved_at.is_some());
    assert_eq!(outcome.booking.status, BookingStatus::Resolved);
    assert_eq!(
        harness.repository.get(seeded.id).unwrap().status,
        BookingStatus::Resolved
    );
    assert_eq!(harness.disputes.get(dispute.id).unwrap(), outcome.dispute);
}

/// Test 2: Only in-progress bookings can be disputed
#[tokio::test]
async fn test_open_requires_in_progress_booking() {
    let harness = Harness::new();
    let workflow = harness.dispute_workflow();
    let seeded = harness.seed(BookingStatus::Confirmed);

    let error = workflow.open(seeded.id, "too early").await.unwrap_err();

    assert!(matches!(
        error,
        BookingError::InvalidTransition {
            from: BookingStatus::Confirmed,
            to: BookingStatus::Disputed,
            ..
        }
    ));
    assert_eq!(harness.repository.get(seeded.id).unwrap(), seeded);
    assert!(harness.disputes.for_booking(seeded.id).is_empty());
}

/// Test 3: A booking that already left Disputed is not touched
#[tokio::test]
async fn test_resolution_without_disputed_booking_is_a_no_op() {
    let harness = Harness::new();
    let workflow = harness.dispute_workflow();
    let seeded = harness.seed(BookingStatus::InProgress);
    let dispute = workflow.open(seeded.id, "quality").await.unwrap();

    // Settled through the booking side first
    harness
        .service
        .transition(seeded.id, BookingStatus::Resolved)
        .await
        .unwrap();
    let before = harness.repository.get(seeded.id).unwrap();

    let outcome = workflow.resolve(dispute.id, "already settled").await.unwrap();

    assert!(!outcome.cascade_applied);
    assert_eq!(outcome.dispute.status, DisputeStatus::Resolved);
    assert_eq!(outcome.booking, before);
    assert_eq!(harness.repository.get(seeded.id).unwrap(), before);
}

/// Test 4: Dispute status rules
#[tokio::test]
async fn test_dispute_transitions_are_enforced() {
    let harness = Harness::new();
    let workflow = harness.dispute_workflow();
    let seeded = harness.seed(BookingStatus::InProgress);
    let dispute = workflow.open(seeded.id, "noise").await.unwrap();

    workflow.resolve(dispute.id, "apology").await.unwrap();

    let again = workflow.resolve(dispute.id, "twice").await.unwrap_err();
    assert_eq!(
        again,
        BookingError::InvalidDisputeTransition {
            dispute_id: dispute.id,
            from: DisputeStatus::Resolved,
            to: DisputeStatus::Resolved,
        }
    );
    assert_eq!(again.kind(), ErrorKind::InvalidTransition);

    let review = workflow.begin_review(dispute.id).await;
    assert!(matches!(review, Err(BookingError::InvalidDisputeTransition { .. })));

    let closed = workflow.close(dispute.id).await.unwrap();
    assert_eq!(closed.status, DisputeStatus::Closed);
    assert!(closed.closed_at.is_some());
    assert_eq!(
        harness.repository.get(seeded.id).unwrap().status,
        BookingStatus::Resolved
    );

    assert!(workflow.close(dispute.id).await.is_err());
}

/// Test 5: Closing without resolving leaves the booking disputed
#[tokio::test]
async fn test_close_never_touches_booking() {
    let harness = Harness::new();
    let workflow = harness.dispute_workflow();
    let seeded = harness.seed(BookingStatus::InProgress);
    let dispute = workflow.open(seeded.id, "withdrawn").await.unwrap();

    workflow.close(dispute.id).await.unwrap();

    assert_eq!(
        harness.repository.get(seeded.id).unwrap().status,
        BookingStatus::Disputed
    );
}

/// Test 6: Unknown dispute
#[tokio::test]
async fn test_unknown_dispute_is_not_found() {
    let harness = Harness::new();
    let workflow = harness.dispute_workflow();
    let missing = DisputeId::new();

    let error = workflow.resolve(missing, "n/a").await.unwrap_err();

    assert_eq!(error, BookingError::dispute_not_found(missing));
}

/// Test 7: A dispute store failure leaves the booking untouched and retryable
#[tokio::test]
async fn test_slow_dispute_store_does_not_strand_booking() {
    let harness = Harness::with(
        InMemoryBookingRepository::new(),
        config_with_timeout(Duration::from_millis(20)),
    );
    let seeded = harness.seed(BookingStatus::InProgress);
    let slow = DisputeWorkflow::new(
        Arc::clone(&harness.service),
        Arc::new(InMemoryDisputeRepository::new().with_latency(Duration::from_millis(200))),
    );

    let error = slow.open(seeded.id, "Work not finished").await.unwrap_err();

    assert!(matches!(
        error,
        BookingError::Timeout {
            operation: "save dispute",
            ..
        }
    ));
    assert_eq!(
        harness.repository.get(seeded.id).unwrap().status,
        BookingStatus::InProgress
    );

    let dispute = harness
        .dispute_workflow()
        .open(seeded.id, "Work not finished")
        .await
        .unwrap();
    assert_eq!(dispute.status, DisputeStatus::Open);
    assert_eq!(
        harness.repository.get(seeded.id).unwrap().status,
        BookingStatus::Disputed
    );
}

/// Dispute store that takes the booking store down right after each write
#[derive(Clone)]
struct OutageAfterSave {
    inner: InMemoryDisputeRepository,
    bookings: InMemoryBookingRepository,
}

impl DisputeRepository for OutageAfterSave {
    async fn find_by_id(&self, id: DisputeId) -> Result<Option<Dispute>, ProviderError> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, dispute: &Dispute) -> Result<(), ProviderError> {
        self.inner.save(dispute).await?;
        self.bookings.set_unavailable(true);
        Ok(())
    }
}

/// Test 8: A booking that cannot be disputed closes the dispute again
#[tokio::test]
async fn test_failed_booking_step_withdraws_dispute() {
    let harness = Harness::new();
    let seeded = harness.seed(BookingStatus::InProgress);
    let store = OutageAfterSave {
        inner: InMemoryDisputeRepository::new(),
        bookings: harness.repository.clone(),
    };
    let workflow = DisputeWorkflow::new(Arc::clone(&harness.service), Arc::new(store.clone()));

    let error = workflow.open(seeded.id, "noise").await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Unavailable);
    assert_eq!(
        harness.repository.get(seeded.id).unwrap().status,
        BookingStatus::InProgress
    );
    let withdrawn = store.inner.for_booking(seeded.id);
    assert_eq!(withdrawn.len(), 1);
    assert_eq!(withdrawn[0].status, DisputeStatus::Closed);
    assert!(withdrawn[0].closed_at.is_some());
}
