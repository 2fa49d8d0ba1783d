use std::sync::Arc;

use troth_core::matching::{
    InMemoryMatchStore, LockManager, MatchContext, MatchStore, RequestManager, SubscriptionCheck,
    UserAccount,
};
use troth_events::{EventBus, EventBusNotifier};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is an `Arc` or wraps one.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub requests: RequestManager,
    pub locks: LockManager,
    /// Bus the managers publish match notices onto.
    pub event_bus: Arc<EventBus>,
    /// Present when the Postgres store is in use; probed by `/health`.
    pub pool: Option<troth_db::DbPool>,
}

impl AppState {
    /// Wire both managers to one store, subscription check, and bus.
    pub fn new(
        config: Arc<ServerConfig>,
        store: Arc<dyn MatchStore>,
        subscriptions: Arc<dyn SubscriptionCheck>,
        event_bus: Arc<EventBus>,
        pool: Option<troth_db::DbPool>,
    ) -> Self {
        let notifier = Arc::new(EventBusNotifier::new(Arc::clone(&event_bus)));
        let ctx = MatchContext::new(store, subscriptions, notifier);
        Self {
            config,
            requests: RequestManager::new(ctx.clone()),
            locks: LockManager::new(ctx),
            event_bus,
            pool,
        }
    }
}

/// Register `names` as subscribed, available users in the in-memory store,
/// returned in the same order.
pub async fn seed_users(store: &InMemoryMatchStore, names: &[String]) -> Vec<UserAccount> {
    let mut users = Vec::with_capacity(names.len());
    for name in names {
        users.push(store.insert_subscribed_user(name.as_str()).await);
    }
    users
}
