#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use troth_api::auth::jwt::{generate_access_token, JwtConfig};
use troth_api::config::{ServerConfig, StoreBackend};
use troth_api::router::build_app_router;
use troth_api::state::AppState;
use troth_core::matching::{InMemoryMatchStore, SubscriptionExpiry, UserAccount};
use troth_events::EventBus;

/// Build a test `ServerConfig` with safe defaults and the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
            issuer: None,
        },
        store: StoreBackend::Memory {
            seed_users: Vec::new(),
        },
    }
}

/// The router plus handles to the state behind it.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryMatchStore>,
    pub event_bus: Arc<EventBus>,
    pub config: ServerConfig,
}

impl TestApp {
    /// Register a subscribed user and return it with a bearer token.
    pub async fn user(&self, name: &str) -> (UserAccount, String) {
        let user = self.store.insert_subscribed_user(name).await;
        let token = self.token_for(user.id);
        (user, token)
    }

    /// Register a user without a subscription.
    pub async fn unsubscribed_user(&self, name: &str) -> (UserAccount, String) {
        let user = self.store.insert_user(name, None).await;
        let token = self.token_for(user.id);
        (user, token)
    }

    pub fn token_for(&self, user_id: i64) -> String {
        generate_access_token(user_id, &self.config.jwt).expect("token generation should succeed")
    }
}

/// Build the full application with the production middleware stack over a
/// fresh in-memory store.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(InMemoryMatchStore::new());
    let event_bus = Arc::new(EventBus::default());

    let state = AppState::new(
        Arc::new(config.clone()),
        store.clone(),
        Arc::new(SubscriptionExpiry),
        Arc::clone(&event_bus),
        None,
    );

    TestApp {
        router: build_app_router(state, &config),
        store,
        event_bus,
        config,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
