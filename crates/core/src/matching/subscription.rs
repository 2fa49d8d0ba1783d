//! Capability check gating accept/decline.

use chrono::Utc;

use super::model::UserAccount;

pub trait SubscriptionCheck: Send + Sync {
    fn has_active_subscription(&self, user: &UserAccount) -> bool;
}

/// Active while `subscription_expires_at` lies in the future.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionExpiry;

impl SubscriptionCheck for SubscriptionExpiry {
    fn has_active_subscription(&self, user: &UserAccount) -> bool {
        user.subscription_expires_at
            .is_some_and(|expires_at| expires_at > Utc::now())
    }
}

/// Treats every user as subscribed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllSubscriptions;

impl SubscriptionCheck for AllowAllSubscriptions {
    fn has_active_subscription(&self, _user: &UserAccount) -> bool {
        true
    }
}
