//! Identity directory trait.

use super::ProviderError;
use crate::types::{CustomerId, ProfessionalId};
use std::future::Future;

/// Answers whether the parties named in a booking request may take part in one.
///
/// Eligibility rules (suspended accounts, unverified professionals) belong to
/// the identity service; the engine only consumes the yes/no.
pub trait IdentityDirectory: Send + Sync {
    /// Whether `id` is an existing customer allowed to book.
    ///
    /// # Errors
    ///
    /// Returns error if the identity service cannot be reached.
    fn is_eligible_customer(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<bool, ProviderError>> + Send;

    /// Whether `id` is an existing professional accepting bookings.
    ///
    /// # Errors
    ///
    /// Returns error if the identity service cannot be reached.
    fn is_eligible_professional(
        &self,
        id: ProfessionalId,
    ) -> impl Future<Output = Result<bool, ProviderError>> + Send;
}
