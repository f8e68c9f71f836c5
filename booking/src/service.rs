//! Booking service: the imperative shell around [`BookingReducer`].
//!
//! Each operation loads the records it needs through the collaborators, runs
//! the reducer, persists the result in one write, and only then hands the
//! published events to the dispatcher.
//!
//! # Concurrency
//!
//! - Creation holds a per-professional lock across the conflict check and the
//!   insert, so two overlapping requests for one professional cannot both pass.
//! - Transitions write with the version they loaded. When another writer got
//!   there first the record is reloaded: a changed status fails with
//!   `InvalidTransition`, an unchanged one re-runs the command.
//! - Every collaborator call is bounded by the configured operation timeout.

use crate::config::{Config, EngineConfig};
use crate::conflict::ConflictDetector;
use crate::dispatcher::SideEffectDispatcher;
use crate::error::{BookingError, EntityKind, Result};
use crate::history::{sort_newest_first, BookingStatistics, HistoryFilter, Role};
use crate::lifecycle::{BookingAction, BookingEnvironment, BookingReducer};
use crate::locks::KeyedLocks;
use crate::metrics;
use crate::providers::{BookingRepository, IdentityDirectory, NotificationSender, ProviderError};
use crate::types::{
    Booking, BookingId, BookingState, BookingStatus, NewBooking, ProfessionalId, TimeWindow,
};
use marketplace_core::{effect::Effect, environment::Clock, reducer::Reducer, SmallVec};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Await a collaborator call, giving up after `after`.
///
/// # Errors
///
/// Returns [`BookingError::Timeout`] when the call does not finish in time and
/// [`BookingError::Provider`] when it fails.
pub(crate) async fn bounded<T, F>(operation: &'static str, after: Duration, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, ProviderError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result.map_err(BookingError::from),
        Err(_) => {
            tracing::warn!(operation, ?after, "collaborator call timed out");
            Err(BookingError::Timeout { operation, after })
        },
    }
}

/// Booking operations backed by injected collaborators
pub struct BookingService<R, I, N> {
    repository: Arc<R>,
    identity: Arc<I>,
    dispatcher: SideEffectDispatcher<N>,
    reducer: BookingReducer,
    env: BookingEnvironment,
    config: EngineConfig,
    professional_locks: KeyedLocks<ProfessionalId>,
}

impl<R, I, N> BookingService<R, I, N>
where
    R: BookingRepository,
    I: IdentityDirectory,
    N: NotificationSender + 'static,
{
    /// Creates a booking service
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        identity: Arc<I>,
        notifications: Arc<N>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            repository,
            identity,
            dispatcher: SideEffectDispatcher::new(notifications, Arc::clone(&clock), &config.dispatch),
            reducer: BookingReducer::new(),
            env: BookingEnvironment::new(clock, config.engine.limits()),
            config: config.engine.clone(),
            professional_locks: KeyedLocks::new(),
        }
    }

    /// The dispatcher, for inspecting failed deliveries
    #[must_use]
    pub const fn dispatcher(&self) -> &SideEffectDispatcher<N> {
        &self.dispatcher
    }

    /// Source of timestamps used by this service
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.env.clock)
    }

    /// Timeout applied to each collaborator call
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        self.config.operation_timeout
    }

    /// Create a booking in `Pending`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The request is malformed → `Validation`
    /// - Either party is unknown or not eligible → `NotFound`
    /// - The professional already has an overlapping active booking → `SchedulingConflict`
    /// - A collaborator fails or times out
    pub async fn create(&self, request: NewBooking) -> Result<Booking> {
        let professional_id = request.professional_id;
        self.create_inner(request)
            .await
            .inspect(|booking| {
                metrics::record_created();
                tracing::info!(
                    booking_id = %booking.id,
                    customer_id = %booking.customer_id,
                    %professional_id,
                    window = %booking.window(),
                    "booking created"
                );
            })
            .inspect_err(|error| Self::observe_failure("create", error))
    }

    async fn create_inner(&self, request: NewBooking) -> Result<Booking> {
        // Malformed input is reported before any collaborator is consulted.
        request.validate(&self.env.limits)?;
        self.check_parties(&request).await?;

        let professional_id = request.professional_id;
        let calendar = self.professional_locks.lock(professional_id).await;

        let active = self
            .call(
                "load professional bookings",
                self.repository.find_active_for_professional(professional_id),
            )
            .await?;

        let booking_id = BookingId::new();
        let mut state = BookingState::with_bookings(active);
        let effects = self.reducer.reduce(
            &mut state,
            BookingAction::PlaceBooking {
                booking_id,
                request,
            },
            &self.env,
        );
        if let Some(error) = state.take_error() {
            return Err(error);
        }

        let booking = state
            .get(&booking_id)
            .cloned()
            .ok_or(BookingError::booking_not_found(booking_id))?;

        match self
            .call("save booking", self.repository.save(&booking, None))
            .await
        {
            Ok(()) => {},
            Err(BookingError::Provider(ProviderError::VersionConflict { .. })) => {
                return Err(BookingError::Validation(format!(
                    "booking {booking_id} already exists"
                )));
            },
            Err(error) => return Err(error),
        }
        drop(calendar);

        self.publish(effects).await;
        Ok(booking)
    }

    async fn check_parties(&self, request: &NewBooking) -> Result<()> {
        let customer_ok = self
            .call(
                "check customer",
                self.identity.is_eligible_customer(request.customer_id),
            )
            .await?;
        if !customer_ok {
            return Err(BookingError::NotFound {
                entity: EntityKind::Customer,
                id: *request.customer_id.as_uuid(),
            });
        }

        let professional_ok = self
            .call(
                "check professional",
                self.identity
                    .is_eligible_professional(request.professional_id),
            )
            .await?;
        if !professional_ok {
            return Err(BookingError::NotFound {
                entity: EntityKind::Professional,
                id: *request.professional_id.as_uuid(),
            });
        }

        Ok(())
    }

    /// Load one booking.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or the collaborator failure.
    pub async fn get(&self, booking_id: BookingId) -> Result<Booking> {
        self.call("load booking", self.repository.find_by_id(booking_id))
            .await?
            .ok_or(BookingError::booking_not_found(booking_id))
    }

    /// Whether an active booking of `professional_id` overlaps `window`.
    ///
    /// Read-only.
    ///
    /// # Errors
    ///
    /// Returns error if the repository fails or times out.
    pub async fn has_conflict(
        &self,
        professional_id: ProfessionalId,
        window: &TimeWindow,
    ) -> Result<bool> {
        let active = self
            .call(
                "load professional bookings",
                self.repository.find_active_for_professional(professional_id),
            )
            .await?;
        let conflict = ConflictDetector::has_conflict(professional_id, window, &active);
        tracing::debug!(%professional_id, %window, conflict, "conflict check");
        Ok(conflict)
    }

    /// Move a booking to `target` through the transition table.
    ///
    /// Reaching `Cancelled` this way records an empty cancellation reason.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The booking does not exist → `NotFound`
    /// - `target` is not reachable from the current status → `InvalidTransition`
    /// - The booking kept changing under every retry → `ConcurrentModification`
    /// - A collaborator fails or times out
    pub async fn transition(&self, booking_id: BookingId, target: BookingStatus) -> Result<Booking> {
        self.apply(booking_id, target, "transition", || BookingAction::TransitionStatus {
            booking_id,
            target,
        })
        .await
    }

    /// Cancel a `Pending` or `Confirmed` booking, storing `reason` verbatim.
    ///
    /// # Errors
    ///
    /// Same as [`transition`](Self::transition); any status other than
    /// `Pending` or `Confirmed` yields `InvalidTransition`.
    pub async fn cancel(&self, booking_id: BookingId, reason: impl Into<String>) -> Result<Booking> {
        let reason = reason.into();
        self.apply(booking_id, BookingStatus::Cancelled, "cancel", || {
            BookingAction::CancelBooking {
                booking_id,
                reason: reason.clone(),
            }
        })
        .await
    }

    async fn apply(
        &self,
        booking_id: BookingId,
        target: BookingStatus,
        operation: &'static str,
        command: impl Fn() -> BookingAction + Send + Sync,
    ) -> Result<Booking> {
        let mut observed = None;
        let mut retries = 0;

        let result = loop {
            match self
                .apply_once(booking_id, target, &mut observed, command())
                .await
            {
                Err(BookingError::Provider(ProviderError::VersionConflict { .. }))
                    if retries < self.config.max_version_retries =>
                {
                    retries += 1;
                    tracing::debug!(%booking_id, retries, "stale booking version, reloading");
                },
                Err(BookingError::Provider(ProviderError::VersionConflict { .. })) => {
                    break Err(BookingError::ConcurrentModification { booking_id });
                },
                other => break other,
            }
        };

        result.inspect_err(|error| Self::observe_failure(operation, error))
    }

    /// One load-reduce-save round.
    ///
    /// `observed` holds the status the first round saw. A reload showing a
    /// different status means a concurrent transition won, and this one must
    /// not be replayed on top of it.
    async fn apply_once(
        &self,
        booking_id: BookingId,
        target: BookingStatus,
        observed: &mut Option<BookingStatus>,
        command: BookingAction,
    ) -> Result<Booking> {
        let current = self.get(booking_id).await?;
        let expected_version = current.version;
        let from = current.status;

        match *observed {
            Some(seen) if seen != from => {
                tracing::debug!(%booking_id, %seen, now = %from, %target, "status changed concurrently");
                return Err(BookingError::InvalidTransition {
                    booking_id,
                    from,
                    to: target,
                });
            },
            Some(_) => {},
            None => *observed = Some(from),
        }

        let mut state = BookingState::with_booking(current);
        let effects = self.reducer.reduce(&mut state, command, &self.env);
        if let Some(error) = state.take_error() {
            return Err(error);
        }

        let updated = state
            .get(&booking_id)
            .cloned()
            .ok_or(BookingError::booking_not_found(booking_id))?;

        self.call(
            "save booking",
            self.repository.save(&updated, Some(expected_version)),
        )
        .await?;

        metrics::record_transition(from, updated.status);
        tracing::info!(
            %booking_id,
            %from,
            to = %updated.status,
            version = updated.version,
            "booking transitioned"
        );

        self.publish(effects).await;
        Ok(updated)
    }

    /// Bookings of `owner` on the `role` side, filtered and newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the repository fails or times out.
    pub async fn list_bookings(
        &self,
        owner: Uuid,
        role: Role,
        filter: HistoryFilter,
    ) -> Result<Vec<Booking>> {
        let mut bookings = self
            .call(
                "query bookings",
                self.repository.query(owner, role, filter.statuses()),
            )
            .await?;
        bookings.retain(|b| filter.matches(b.status));
        sort_newest_first(&mut bookings);
        Ok(bookings)
    }

    /// Per-status counts of `owner`'s bookings on the `role` side.
    ///
    /// # Errors
    ///
    /// Returns error if the repository fails or times out.
    pub async fn statistics(&self, owner: Uuid, role: Role) -> Result<BookingStatistics> {
        let bookings = self
            .call(
                "query bookings",
                self.repository.query(owner, role, &BookingStatus::ALL),
            )
            .await?;
        Ok(BookingStatistics::from_bookings(&bookings))
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        future: impl Future<Output = std::result::Result<T, ProviderError>>,
    ) -> Result<T> {
        bounded(operation, self.config.operation_timeout, future).await
    }

    async fn publish(&self, effects: SmallVec<[Effect<BookingAction>; 4]>) {
        let events: Vec<BookingAction> = effects
            .into_iter()
            .filter_map(Effect::into_published)
            .collect();
        self.dispatcher.dispatch(events).await;
    }

    fn observe_failure(operation: &'static str, error: &BookingError) {
        metrics::record_rejection(error);
        if error.is_business_rule() {
            tracing::debug!(operation, kind = error.kind().as_str(), %error, "operation rejected");
        } else {
            tracing::warn!(operation, kind = error.kind().as_str(), %error, "operation failed");
        }
    }
}

impl<R, I, N> std::fmt::Debug for BookingService<R, I, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
