//! Dispute workflow.
//!
//! Disputes have their own small lifecycle (`Open → InReview → Resolved →
//! Closed`, with shortcuts) and reach into the booking lifecycle at two
//! points: opening a dispute moves the booking to `Disputed`, and resolving
//! one moves a still-`Disputed` booking to `Resolved`. Both go through
//! [`BookingService::transition`], so the booking transition table applies
//! unchanged.

use crate::error::{BookingError, Result};
use crate::metrics;
use crate::providers::{BookingRepository, DisputeRepository, IdentityDirectory, NotificationSender};
use crate::service::{bounded, BookingService};
use crate::types::{Booking, BookingId, BookingStatus, Dispute, DisputeId, DisputeStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Outcome of resolving a dispute
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeResolution {
    /// The dispute as stored after resolution
    pub dispute: Dispute,
    /// The linked booking after the cascade
    pub booking: Booking,
    /// Whether the booking was moved to `Resolved`
    pub cascade_applied: bool,
}

/// Drives disputes and their effect on bookings
pub struct DisputeWorkflow<R, I, N, D> {
    bookings: Arc<BookingService<R, I, N>>,
    disputes: Arc<D>,
}

impl<R, I, N, D> DisputeWorkflow<R, I, N, D>
where
    R: BookingRepository,
    I: IdentityDirectory,
    N: NotificationSender + 'static,
    D: DisputeRepository,
{
    /// Creates a workflow on top of a booking service
    #[must_use]
    pub const fn new(bookings: Arc<BookingService<R, I, N>>, disputes: Arc<D>) -> Self {
        Self { bookings, disputes }
    }

    /// Raise a dispute against an `InProgress` booking.
    ///
    /// The dispute is stored before the booking moves to `Disputed`, so a
    /// failure at either step leaves no disputed booking without a dispute.
    /// When the booking step fails the stored dispute is closed again.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The booking does not exist → `NotFound`
    /// - The booking is not `InProgress` → `InvalidTransition`
    /// - A collaborator fails or times out
    pub async fn open(&self, booking_id: BookingId, reason: impl Into<String>) -> Result<Dispute> {
        let booking = self.bookings.get(booking_id).await?;
        if !booking.status.can_transition_to(BookingStatus::Disputed) {
            return Err(BookingError::InvalidTransition {
                booking_id,
                from: booking.status,
                to: BookingStatus::Disputed,
            });
        }

        let dispute = Dispute::open(DisputeId::new(), booking_id, reason.into(), self.now());
        self.save(&dispute).await?;

        match self
            .bookings
            .transition(booking_id, BookingStatus::Disputed)
            .await
        {
            Ok(_) => {
                tracing::info!(dispute_id = %dispute.id, %booking_id, "dispute opened");
                Ok(dispute)
            },
            Err(error) => {
                self.withdraw(dispute).await;
                Err(error)
            },
        }
    }

    /// Close a dispute whose booking never reached `Disputed`
    async fn withdraw(&self, mut dispute: Dispute) {
        dispute.status = DisputeStatus::Closed;
        dispute.closed_at = Some(self.now().max(dispute.opened_at));
        match self.save(&dispute).await {
            Ok(()) => {
                tracing::info!(dispute_id = %dispute.id, booking_id = %dispute.booking_id, "dispute withdrawn");
            },
            Err(error) => tracing::warn!(
                dispute_id = %dispute.id,
                booking_id = %dispute.booking_id,
                %error,
                "could not withdraw dispute; it stays open without a disputed booking"
            ),
        }
    }

    /// Start reviewing an open dispute.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown dispute, `InvalidDisputeTransition`
    /// unless it is `Open`, or the collaborator failure.
    pub async fn begin_review(&self, dispute_id: DisputeId) -> Result<Dispute> {
        let mut dispute = self.load_for(dispute_id, DisputeStatus::InReview).await?;
        dispute.status = DisputeStatus::InReview;
        self.save(&dispute).await?;

        tracing::info!(%dispute_id, "dispute in review");
        Ok(dispute)
    }

    /// Record a resolution, then settle the booking if it is still `Disputed`.
    ///
    /// The dispute is stored before the booking is touched. A booking that has
    /// left `Disputed` in the meantime is left alone.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown dispute or booking,
    /// `InvalidDisputeTransition` unless the dispute is `Open` or `InReview`,
    /// or the collaborator failure.
    pub async fn resolve(
        &self,
        dispute_id: DisputeId,
        resolution: impl Into<String>,
    ) -> Result<DisputeResolution> {
        let mut dispute = self.load_for(dispute_id, DisputeStatus::Resolved).await?;
        dispute.status = DisputeStatus::Resolved;
        dispute.resolution = Some(resolution.into());
        dispute.resolved_at = Some(self.now().max(dispute.opened_at));
        self.save(&dispute).await?;

        let (booking, cascade_applied) = self.cascade(dispute.booking_id).await?;
        metrics::record_cascade(cascade_applied);

        tracing::info!(
            %dispute_id,
            booking_id = %booking.id,
            booking_status = %booking.status,
            cascade_applied,
            "dispute resolved"
        );
        Ok(DisputeResolution {
            dispute,
            booking,
            cascade_applied,
        })
    }

    async fn cascade(&self, booking_id: BookingId) -> Result<(Booking, bool)> {
        let booking = self.bookings.get(booking_id).await?;
        if booking.status != BookingStatus::Disputed {
            tracing::info!(%booking_id, status = %booking.status, "booking not disputed, cascade skipped");
            return Ok((booking, false));
        }

        match self
            .bookings
            .transition(booking_id, BookingStatus::Resolved)
            .await
        {
            Ok(resolved) => Ok((resolved, true)),
            Err(BookingError::InvalidTransition { from, .. }) => {
                tracing::info!(%booking_id, status = %from, "booking changed concurrently, cascade skipped");
                Ok((self.bookings.get(booking_id).await?, false))
            },
            Err(error) => Err(error),
        }
    }

    /// Archive a dispute. Never touches the booking.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown dispute, `InvalidDisputeTransition`
    /// if it is already `Closed`, or the collaborator failure.
    pub async fn close(&self, dispute_id: DisputeId) -> Result<Dispute> {
        let mut dispute = self.load_for(dispute_id, DisputeStatus::Closed).await?;
        dispute.status = DisputeStatus::Closed;
        dispute.closed_at = Some(self.now().max(dispute.opened_at));
        self.save(&dispute).await?;

        tracing::info!(%dispute_id, "dispute closed");
        Ok(dispute)
    }

    /// Load a dispute that is allowed to move to `target`
    async fn load_for(&self, dispute_id: DisputeId, target: DisputeStatus) -> Result<Dispute> {
        let dispute = bounded(
            "load dispute",
            self.bookings.operation_timeout(),
            self.disputes.find_by_id(dispute_id),
        )
        .await?
        .ok_or(BookingError::dispute_not_found(dispute_id))?;

        if !dispute.status.can_transition_to(target) {
            return Err(BookingError::InvalidDisputeTransition {
                dispute_id,
                from: dispute.status,
                to: target,
            });
        }
        Ok(dispute)
    }

    async fn save(&self, dispute: &Dispute) -> Result<()> {
        bounded(
            "save dispute",
            self.bookings.operation_timeout(),
            self.disputes.save(dispute),
        )
        .await
    }

    fn now(&self) -> DateTime<Utc> {
        self.bookings.clock().now()
    }
}

impl<R, I, N, D> std::fmt::Debug for DisputeWorkflow<R, I, N, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisputeWorkflow").finish_non_exhaustive()
    }
}
