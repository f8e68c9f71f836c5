//! Dispute persistence trait.

use super::ProviderError;
use crate::types::{Dispute, DisputeId};
use std::future::Future;

/// Dispute repository.
pub trait DisputeRepository: Send + Sync {
    /// Load one dispute.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached. A missing dispute is `Ok(None)`.
    fn find_by_id(
        &self,
        id: DisputeId,
    ) -> impl Future<Output = Result<Option<Dispute>, ProviderError>> + Send;

    /// Insert or replace a dispute.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn save(&self, dispute: &Dispute) -> impl Future<Output = Result<(), ProviderError>> + Send;
}
