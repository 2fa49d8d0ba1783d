//! Store doubles shared by the manager tests.

use std::sync::Arc;

use async_trait::async_trait;

use super::memory::InMemoryMatchStore;
use super::model::{ConnectionRequest, Couple, Lock, LockId, UserAccount, UserId};
use super::store::{Changeset, CommitReceipt, MatchStore, StoreError};

/// Reads from the wrapped store; every commit fails as a backend error.
pub(crate) struct BrokenCommits(pub Arc<InMemoryMatchStore>);

#[async_trait]
impl MatchStore for BrokenCommits {
    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        self.0.find_user(id).await
    }

    async fn find_asked_request(
        &self,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<Option<ConnectionRequest>, StoreError> {
        self.0.find_asked_request(from_id, to_id).await
    }

    async fn list_requests_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConnectionRequest>, StoreError> {
        self.0.list_requests_for_user(user_id).await
    }

    async fn find_lock(&self, id: LockId) -> Result<Option<Lock>, StoreError> {
        self.0.find_lock(id).await
    }

    async fn find_couple_for_user(&self, user_id: UserId) -> Result<Option<Couple>, StoreError> {
        self.0.find_couple_for_user(user_id).await
    }

    async fn commit(&self, _changes: Changeset) -> Result<CommitReceipt, StoreError> {
        Err(StoreError::Backend("connection reset by peer".into()))
    }
}
