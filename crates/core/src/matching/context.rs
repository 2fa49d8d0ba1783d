use std::sync::Arc;

use crate::error::CoreError;

use super::messages::MatchOperation;
use super::model::{UserAccount, UserId};
use super::notice::{MatchNotice, MatchNotifier};
use super::outcome::{FailureReason, MatchOutcome};
use super::store::MatchStore;
use super::subscription::SubscriptionCheck;

/// Collaborators shared by both managers. Cheap to clone.
#[derive(Clone)]
pub struct MatchContext {
    pub store: Arc<dyn MatchStore>,
    pub subscriptions: Arc<dyn SubscriptionCheck>,
    pub notifier: Arc<dyn MatchNotifier>,
}

impl MatchContext {
    pub fn new(
        store: Arc<dyn MatchStore>,
        subscriptions: Arc<dyn SubscriptionCheck>,
        notifier: Arc<dyn MatchNotifier>,
    ) -> Self {
        Self {
            store,
            subscriptions,
            notifier,
        }
    }

    pub(crate) async fn load_user(&self, id: UserId) -> Result<UserAccount, CoreError> {
        self.store
            .find_user(id)
            .await?
            .ok_or(CoreError::NotFound { entity: "User", id })
    }

    pub(crate) fn dispatch(&self, notice: MatchNotice) {
        tracing::debug!(
            event_type = notice.event_type(),
            recipient = notice.recipient(),
            "Dispatching match notice"
        );
        self.notifier.notify(notice);
    }
}

/// The acting user must be the authenticated caller.
pub(crate) fn ensure_caller(caller: UserId, acting: UserId) -> Result<(), CoreError> {
    if caller != acting {
        return Err(CoreError::Forbidden(format!(
            "User {caller} may not act on behalf of user {acting}"
        )));
    }
    Ok(())
}

/// Fold the business phase of an operation into the outcome envelope.
///
/// `Conflict` and `Persistence` become `success = false`. `NotFound`,
/// `Forbidden` and anything else propagate as errors.
pub(crate) fn settle<T>(
    operation: MatchOperation,
    counterpart_name: &str,
    result: Result<T, CoreError>,
) -> Result<MatchOutcome, CoreError> {
    match result {
        Ok(_) => Ok(MatchOutcome::succeeded(operation, counterpart_name)),
        Err(CoreError::Conflict(detail)) => {
            tracing::warn!(operation = operation.as_str(), %detail, "Match transition rejected");
            Ok(MatchOutcome::failed(
                operation,
                counterpart_name,
                FailureReason::Conflict,
            ))
        }
        Err(CoreError::Persistence(detail)) => {
            tracing::error!(operation = operation.as_str(), %detail, "Match transition not persisted");
            Ok(MatchOutcome::failed(
                operation,
                counterpart_name,
                FailureReason::PersistenceFailure,
            ))
        }
        Err(other) => Err(other),
    }
}
