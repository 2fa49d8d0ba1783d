//! In-memory [`MatchStore`].
//!
//! All tables sit behind one `tokio::sync::Mutex`, so every commit is
//! serialized. A commit validates every expectation before it writes
//! anything, which gives the same all-or-nothing behaviour as the Postgres
//! store's transaction.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::types::{DbId, Timestamp};

use super::model::{ConnectionRequest, Couple, Lock, LockId, UserAccount, UserId};
use super::status::{RequestStatus, UserStatus};
use super::store::{
    Changeset, CommitReceipt, LockBinding, LockWrite, MatchStore, RequestWrite, StoreError,
};

#[derive(Debug, Default)]
struct Tables {
    next_id: DbId,
    users: BTreeMap<UserId, UserAccount>,
    requests: BTreeMap<DbId, ConnectionRequest>,
    locks: BTreeMap<LockId, Lock>,
    couples: BTreeMap<DbId, Couple>,
}

impl Tables {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn asked_request(&self, from_id: UserId, to_id: UserId) -> Option<&ConnectionRequest> {
        self.requests.values().find(|r| {
            r.from_id == from_id && r.to_id == to_id && r.status == RequestStatus::Asked
        })
    }

    fn active_lock_for(&self, user_id: UserId) -> Option<&Lock> {
        self.locks
            .values()
            .find(|l| l.is_active && l.involves(user_id))
    }

    /// Check every expectation of `changes` without writing.
    fn validate(&self, changes: &Changeset) -> Result<(), StoreError> {
        for write in &changes.users {
            let user = self
                .users
                .get(&write.user_id)
                .ok_or_else(|| StoreError::Stale(format!("User {} vanished", write.user_id)))?;
            if user.version != write.expected_version {
                return Err(StoreError::Stale(format!(
                    "User {} changed (version {} != {})",
                    user.id, user.version, write.expected_version
                )));
            }
        }

        if changes.binds_created_lock() && !matches!(changes.lock, Some(LockWrite::Insert { .. })) {
            return Err(StoreError::Backend(
                "Changeset binds users to a lock it does not create".into(),
            ));
        }

        match &changes.request {
            Some(RequestWrite::Insert { from_id, to_id, .. }) => {
                if self.asked_request(*from_id, *to_id).is_some() {
                    return Err(StoreError::Stale(format!(
                        "A pending request from user {from_id} to user {to_id} already exists"
                    )));
                }
            }
            Some(RequestWrite::Transition { request_id, .. }) => {
                let request = self.requests.get(request_id).ok_or_else(|| {
                    StoreError::Stale(format!("Request {request_id} vanished"))
                })?;
                if request.status != RequestStatus::Asked {
                    return Err(StoreError::Stale(format!(
                        "Request {request_id} is already {}",
                        request.status
                    )));
                }
            }
            None => {}
        }

        match &changes.lock {
            Some(LockWrite::Insert {
                one_id, another_id, ..
            }) => {
                for user_id in [one_id, another_id] {
                    if let Some(existing) = self.active_lock_for(*user_id) {
                        return Err(StoreError::Stale(format!(
                            "User {user_id} already holds active lock {}",
                            existing.id
                        )));
                    }
                }
            }
            Some(LockWrite::Update {
                expected_version,
                lock,
            }) => {
                let current = self
                    .locks
                    .get(&lock.id)
                    .ok_or_else(|| StoreError::Stale(format!("Lock {} vanished", lock.id)))?;
                if current.version != *expected_version {
                    return Err(StoreError::Stale(format!(
                        "Lock {} changed (version {} != {expected_version})",
                        lock.id, current.version
                    )));
                }
            }
            None => {}
        }

        if let Some(couple) = &changes.couple {
            let already = self.couples.values().any(|c| {
                c.lock_id == couple.lock_id
                    || [c.one_id, c.another_id]
                        .iter()
                        .any(|id| *id == couple.one_id || *id == couple.another_id)
            });
            if already {
                return Err(StoreError::Stale(format!(
                    "A couple already exists for lock {}",
                    couple.lock_id
                )));
            }
        }

        Ok(())
    }

    /// Apply a validated changeset.
    fn apply(&mut self, changes: Changeset) -> CommitReceipt {
        let mut receipt = CommitReceipt::default();

        let mut created_lock: Option<LockId> = None;
        match changes.lock {
            Some(LockWrite::Insert {
                one_id,
                another_id,
                created_at,
            }) => {
                let id = self.allocate_id();
                let lock = Lock {
                    id,
                    one_id,
                    another_id,
                    is_active: true,
                    reject_requested_by: None,
                    created_at,
                    ended_at: None,
                    end_reason: None,
                    ended_by: None,
                    version: 1,
                };
                self.locks.insert(id, lock.clone());
                created_lock = Some(id);
                receipt.lock = Some(lock);
            }
            Some(LockWrite::Update { lock, .. }) => {
                let updated = Lock {
                    version: lock.version + 1,
                    ..lock
                };
                self.locks.insert(updated.id, updated.clone());
                receipt.lock = Some(updated);
            }
            None => {}
        }

        for write in changes.users {
            if let Some(user) = self.users.get_mut(&write.user_id) {
                user.status = write.status;
                user.lock_id = match write.lock {
                    LockBinding::Unbound => None,
                    LockBinding::Existing(id) => Some(id),
                    LockBinding::Created => created_lock,
                };
                user.version += 1;
            }
        }

        match changes.request {
            Some(RequestWrite::Insert {
                from_id,
                to_id,
                asked_date,
            }) => {
                let id = self.allocate_id();
                let request = ConnectionRequest {
                    id,
                    from_id,
                    to_id,
                    status: RequestStatus::Asked,
                    asked_date,
                    approved_date: None,
                    rejected_date: None,
                    withdraw_date: None,
                };
                self.requests.insert(id, request.clone());
                receipt.request = Some(request);
            }
            Some(RequestWrite::Transition {
                request_id,
                status,
                at,
            }) => {
                if let Some(request) = self.requests.get_mut(&request_id) {
                    stamp_request(request, status, at);
                    receipt.request = Some(request.clone());
                }
            }
            None => {}
        }

        if let Some(new_couple) = changes.couple {
            let id = self.allocate_id();
            let couple = Couple {
                id,
                one_id: new_couple.one_id,
                another_id: new_couple.another_id,
                lock_id: new_couple.lock_id,
                married_date: new_couple.married_date,
            };
            self.couples.insert(id, couple.clone());
            receipt.couple = Some(couple);
        }

        receipt
    }
}

fn stamp_request(request: &mut ConnectionRequest, status: RequestStatus, at: Timestamp) {
    request.status = status;
    match status {
        RequestStatus::Accepted => request.approved_date = Some(at),
        RequestStatus::Declined => request.rejected_date = Some(at),
        RequestStatus::Withdrawn => request.withdraw_date = Some(at),
        RequestStatus::Asked => {}
    }
}

/// Process-local match store. Used by tests and by the API when no database
/// is configured.
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    tables: Mutex<Tables>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an available user. The account store is owned by the
    /// surrounding application; this stands in for its signup flow.
    pub async fn insert_user(
        &self,
        name: impl Into<String>,
        subscription_expires_at: Option<Timestamp>,
    ) -> UserAccount {
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        let user = UserAccount {
            id,
            name: name.into(),
            status: UserStatus::Available,
            lock_id: None,
            subscription_expires_at,
            version: 1,
        };
        tables.users.insert(id, user.clone());
        user
    }

    /// Register a user subscribed for the next year.
    pub async fn insert_subscribed_user(&self, name: impl Into<String>) -> UserAccount {
        self.insert_user(name, Some(Utc::now() + chrono::Duration::days(365)))
            .await
    }

    pub async fn couple_count(&self) -> usize {
        self.tables.lock().await.couples.len()
    }

    pub async fn active_lock_count(&self) -> usize {
        self.tables
            .lock()
            .await
            .locks
            .values()
            .filter(|l| l.is_active)
            .count()
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_asked_request(
        &self,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<Option<ConnectionRequest>, StoreError> {
        Ok(self.tables.lock().await.asked_request(from_id, to_id).cloned())
    }

    async fn list_requests_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConnectionRequest>, StoreError> {
        let tables = self.tables.lock().await;
        let mut requests: Vec<ConnectionRequest> = tables
            .requests
            .values()
            .filter(|r| r.from_id == user_id || r.to_id == user_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.asked_date.cmp(&a.asked_date).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn find_lock(&self, id: LockId) -> Result<Option<Lock>, StoreError> {
        Ok(self.tables.lock().await.locks.get(&id).cloned())
    }

    async fn find_couple_for_user(&self, user_id: UserId) -> Result<Option<Couple>, StoreError> {
        Ok(self
            .tables
            .lock()
            .await
            .couples
            .values()
            .find(|c| c.one_id == user_id || c.another_id == user_id)
            .cloned())
    }

    async fn commit(&self, changes: Changeset) -> Result<CommitReceipt, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.validate(&changes)?;
        Ok(tables.apply(changes))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::matching::store::UserWrite;

    #[tokio::test]
    async fn insert_request_then_duplicate_is_stale() {
        let store = InMemoryMatchStore::new();
        let a = store.insert_user("A", None).await;
        let b = store.insert_user("B", None).await;

        let insert = Changeset::default().with_request(RequestWrite::Insert {
            from_id: a.id,
            to_id: b.id,
            asked_date: Utc::now(),
        });
        let receipt = store.commit(insert.clone()).await.unwrap();
        assert_eq!(receipt.request.unwrap().status, RequestStatus::Asked);

        assert_matches!(store.commit(insert).await, Err(StoreError::Stale(_)));
    }

    #[tokio::test]
    async fn created_lock_is_bound_to_both_users() {
        let store = InMemoryMatchStore::new();
        let a = store.insert_user("A", None).await;
        let b = store.insert_user("B", None).await;

        let changes = Changeset::default()
            .with_lock(LockWrite::Insert {
                one_id: a.id,
                another_id: b.id,
                created_at: Utc::now(),
            })
            .with_user(UserWrite::set(&a, UserStatus::Locked, LockBinding::Created))
            .with_user(UserWrite::set(&b, UserStatus::Locked, LockBinding::Created));
        let receipt = store.commit(changes).await.unwrap();
        let lock = receipt.lock.unwrap();

        let a = store.find_user(a.id).await.unwrap().unwrap();
        let b = store.find_user(b.id).await.unwrap().unwrap();
        assert_eq!(a.lock_id, Some(lock.id));
        assert_eq!(b.lock_id, Some(lock.id));
        assert_eq!(a.version, 2);
    }

    #[tokio::test]
    async fn stale_user_version_writes_nothing() {
        let store = InMemoryMatchStore::new();
        let a = store.insert_user("A", None).await;
        let b = store.insert_user("B", None).await;

        let mut stale_b = UserWrite::set(&b, UserStatus::Locked, LockBinding::Created);
        stale_b.expected_version = 99;
        let changes = Changeset::default()
            .with_lock(LockWrite::Insert {
                one_id: a.id,
                another_id: b.id,
                created_at: Utc::now(),
            })
            .with_user(UserWrite::set(&a, UserStatus::Locked, LockBinding::Created))
            .with_user(stale_b);

        assert_matches!(store.commit(changes).await, Err(StoreError::Stale(_)));
        assert_eq!(store.active_lock_count().await, 0);
        let a = store.find_user(a.id).await.unwrap().unwrap();
        assert_eq!(a.status, UserStatus::Available);
        assert_eq!(a.version, 1);
    }

    #[tokio::test]
    async fn requests_are_listed_newest_first() {
        let store = InMemoryMatchStore::new();
        let a = store.insert_user("A", None).await;
        let b = store.insert_user("B", None).await;
        let c = store.insert_user("C", None).await;

        let earlier = Utc::now() - chrono::Duration::hours(1);
        for (from_id, to_id, asked_date) in [(a.id, b.id, earlier), (c.id, a.id, Utc::now())] {
            store
                .commit(Changeset::default().with_request(RequestWrite::Insert {
                    from_id,
                    to_id,
                    asked_date,
                }))
                .await
                .unwrap();
        }

        let listed = store.list_requests_for_user(a.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].from_id, c.id);
        assert!(store.list_requests_for_user(b.id).await.unwrap().len() == 1);
    }
}
