//! Create, withdraw, accept, and decline connection requests.

use chrono::Utc;
use serde::Serialize;

use crate::error::CoreError;

use super::context::{ensure_caller, settle, MatchContext};
use super::messages::MatchOperation;
use super::model::{ConnectionRequest, Lock, UserAccount, UserId};
use super::notice::MatchNotice;
use super::outcome::MatchOutcome;
use super::status::UserStatus;
use super::store::CommitReceipt;
use super::transition;

/// Which request actions a viewer may take on another user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestActions {
    pub can_send: bool,
    pub can_withdraw: bool,
    pub can_accept: bool,
    pub can_decline: bool,
}

/// Enforces the request lifecycle on the ledger and the account store.
#[derive(Clone)]
pub struct RequestManager {
    ctx: MatchContext,
}

impl RequestManager {
    pub fn new(ctx: MatchContext) -> Self {
        Self { ctx }
    }

    /// `from` asks `to` to begin courtship.
    pub async fn create_request(
        &self,
        caller: UserId,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        ensure_caller(caller, from_id)?;
        let from = self.ctx.load_user(from_id).await?;
        let to = self.ctx.load_user(to_id).await?;

        let result = self.commit_create(&from, &to).await;
        if let Ok(request) = &result {
            tracing::info!(
                request_id = request.id,
                from_id,
                to_id,
                "Connection request created"
            );
            self.ctx.dispatch(MatchNotice::RequestReceived {
                request_id: request.id,
                from_id,
                to_id,
            });
        }
        settle(MatchOperation::CreateRequest, &to.name, result)
    }

    async fn commit_create(
        &self,
        from: &UserAccount,
        to: &UserAccount,
    ) -> Result<ConnectionRequest, CoreError> {
        let open = self.ctx.store.find_asked_request(from.id, to.id).await?;
        let changes = transition::plan_create_request(from, to, open.as_ref(), Utc::now())?;
        let receipt = self.ctx.store.commit(changes).await?;
        committed_request(receipt)
    }

    /// `from` takes back its pending request to `to`.
    pub async fn withdraw_request(
        &self,
        caller: UserId,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        ensure_caller(caller, from_id)?;
        self.ctx.load_user(from_id).await?;
        let to = self.ctx.load_user(to_id).await?;

        let result = self.commit_withdraw(from_id, to_id).await;
        if let Ok(request) = &result {
            tracing::info!(request_id = request.id, from_id, to_id, "Connection request withdrawn");
            self.ctx.dispatch(MatchNotice::RequestWithdrawn {
                request_id: request.id,
                from_id,
                to_id,
            });
        }
        settle(MatchOperation::WithdrawRequest, &to.name, result)
    }

    async fn commit_withdraw(
        &self,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<ConnectionRequest, CoreError> {
        let open = self.ctx.store.find_asked_request(from_id, to_id).await?;
        let changes = transition::plan_withdraw_request(open.as_ref(), Utc::now())?;
        let receipt = self.ctx.store.commit(changes).await?;
        committed_request(receipt)
    }

    /// `to` accepts `from`'s request; the pair becomes locked.
    ///
    /// The request transition, the new lock, and both user updates land in
    /// one commit.
    pub async fn accept_request(
        &self,
        caller: UserId,
        to_id: UserId,
        from_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        let to = self.load_subscribed_recipient(caller, to_id).await?;
        let from = self.ctx.load_user(from_id).await?;

        let result = self.commit_accept(&to, &from).await;
        if let Ok((request, lock)) = &result {
            tracing::info!(
                request_id = request.id,
                lock_id = lock.id,
                from_id,
                to_id,
                "Connection request accepted, users locked"
            );
            self.ctx.dispatch(MatchNotice::RequestAccepted {
                request_id: request.id,
                lock_id: lock.id,
                from_id,
                to_id,
            });
        }
        settle(MatchOperation::AcceptRequest, &from.name, result)
    }

    async fn commit_accept(
        &self,
        to: &UserAccount,
        from: &UserAccount,
    ) -> Result<(ConnectionRequest, Lock), CoreError> {
        let open = self.ctx.store.find_asked_request(from.id, to.id).await?;
        let changes = transition::plan_accept_request(to, from, open.as_ref(), Utc::now())?;
        let receipt = self.ctx.store.commit(changes).await?;
        let lock = receipt
            .lock
            .clone()
            .ok_or_else(|| CoreError::Internal("Accept commit returned no lock".into()))?;
        Ok((committed_request(receipt)?, lock))
    }

    /// `to` turns down `from`'s request. User states are untouched.
    pub async fn decline_request(
        &self,
        caller: UserId,
        to_id: UserId,
        from_id: UserId,
    ) -> Result<MatchOutcome, CoreError> {
        self.load_subscribed_recipient(caller, to_id).await?;
        let from = self.ctx.load_user(from_id).await?;

        let result = self.commit_decline(from_id, to_id).await;
        if let Ok(request) = &result {
            tracing::info!(request_id = request.id, from_id, to_id, "Connection request declined");
            self.ctx.dispatch(MatchNotice::RequestDeclined {
                request_id: request.id,
                from_id,
                to_id,
            });
        }
        settle(MatchOperation::DeclineRequest, &from.name, result)
    }

    async fn commit_decline(
        &self,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<ConnectionRequest, CoreError> {
        let open = self.ctx.store.find_asked_request(from_id, to_id).await?;
        let changes = transition::plan_decline_request(open.as_ref(), Utc::now())?;
        let receipt = self.ctx.store.commit(changes).await?;
        committed_request(receipt)
    }

    /// Every request the user has sent or received, newest first.
    pub async fn list_requests(
        &self,
        caller: UserId,
        user_id: UserId,
    ) -> Result<Vec<ConnectionRequest>, CoreError> {
        ensure_caller(caller, user_id)?;
        self.ctx.load_user(user_id).await?;
        Ok(self.ctx.store.list_requests_for_user(user_id).await?)
    }

    /// Derive the profile buttons from the open requests between the two
    /// users. Nothing is offered on the viewer's own profile.
    pub async fn request_actions(
        &self,
        viewer_id: UserId,
        profile_id: UserId,
    ) -> Result<RequestActions, CoreError> {
        let viewer = self.ctx.load_user(viewer_id).await?;
        let profile = self.ctx.load_user(profile_id).await?;
        if viewer.id == profile.id {
            return Ok(RequestActions {
                can_send: false,
                can_withdraw: false,
                can_accept: false,
                can_decline: false,
            });
        }

        let outgoing = self.ctx.store.find_asked_request(viewer.id, profile.id).await?;
        let incoming = self.ctx.store.find_asked_request(profile.id, viewer.id).await?;
        let unmarried = viewer.status != UserStatus::Married && profile.status != UserStatus::Married;
        let can_respond = incoming.is_some() && self.ctx.subscriptions.has_active_subscription(&viewer);

        Ok(RequestActions {
            can_send: outgoing.is_none() && incoming.is_none() && unmarried,
            can_withdraw: outgoing.is_some(),
            can_accept: can_respond && viewer.is_available() && profile.is_available(),
            can_decline: can_respond,
        })
    }

    /// Identity and capability checks shared by accept and decline.
    async fn load_subscribed_recipient(
        &self,
        caller: UserId,
        to_id: UserId,
    ) -> Result<UserAccount, CoreError> {
        ensure_caller(caller, to_id)?;
        let to = self.ctx.load_user(to_id).await?;
        if !self.ctx.subscriptions.has_active_subscription(&to) {
            return Err(CoreError::Forbidden(format!(
                "User {to_id} has no active subscription"
            )));
        }
        Ok(to)
    }
}

fn committed_request(receipt: CommitReceipt) -> Result<ConnectionRequest, CoreError> {
    receipt
        .request
        .ok_or_else(|| CoreError::Internal("Commit returned no request".into()))
}
