//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - A mock Taskdeck API (wiremock) per test
//! - An application context wired to it over in-memory session storage
//! - JSON fixtures for users, tasks and envelopes

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use taskdeck_client::app::AppContext;
use taskdeck_client::config::ClientConfig;
use taskdeck_shared::models::User;
use taskdeck_shared::storage::{MemoryStore, SessionStore};
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";
pub const BEARER: &str = "Bearer test-token";

/// Test context containing all necessary resources
pub struct TestContext {
    pub server: MockServer,
    pub app: AppContext,
    pub storage: SessionStore,
}

impl TestContext {
    /// Creates a context with no persisted session
    pub async fn new() -> Self {
        Self::with_backend(MemoryStore::new()).await
    }

    /// Creates a context whose storage already holds a token and user
    pub async fn signed_in() -> Self {
        let backend = MemoryStore::with_entries([
            ("token", TOKEN.to_string()),
            ("user", user_json().to_string()),
        ]);
        Self::with_backend(backend).await
    }

    /// Creates a context that is restored and authenticated
    ///
    /// Mounts a one-shot `GET /auth/me` mock for the restore.
    pub async fn authenticated() -> Self {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, ResponseTemplate};

        let ctx = Self::signed_in().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok(user_json())))
            .up_to_n_times(1)
            .mount(&ctx.server)
            .await;

        ctx.app.session.restore().await;
        assert!(ctx.app.session.is_authenticated());
        ctx
    }

    async fn with_backend(backend: MemoryStore) -> Self {
        let server = MockServer::start().await;
        let backend = Arc::new(backend);
        let storage = SessionStore::new(backend.clone());

        let mut config = ClientConfig::for_base_url(server.uri());
        config.api.timeout_secs = 5;

        let app = AppContext::new(config, backend).expect("Failed to build app context");

        Self {
            server,
            app,
            storage,
        }
    }

    pub fn stored_token(&self) -> Option<String> {
        self.storage.token().expect("storage read")
    }

    pub fn stored_user(&self) -> Option<User> {
        self.storage.user().expect("storage read")
    }
}

pub fn user_json() -> Value {
    json!({
        "id": "u1",
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "role": "user",
        "createdAt": "2026-01-01T00:00:00Z"
    })
}

pub fn task_json(id: &str, title: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "status": "pending",
        "priority": "medium",
        "user": "u1",
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:00:00Z"
    })
}

/// `{success: true, data}`
pub fn ok(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

/// `{success: true, data: {user, token}}`
pub fn auth_ok(token: &str) -> Value {
    ok(json!({ "user": user_json(), "token": token }))
}

/// `{success: false, message}`
pub fn failure(message: &str) -> Value {
    json!({ "success": false, "message": message })
}

/// Paginated listing of `tasks`
pub fn page(tasks: Vec<Value>, page: u32, total: u64) -> Value {
    let pages = total.div_ceil(10).max(1);
    json!({
        "success": true,
        "data": tasks,
        "pagination": { "page": page, "limit": 10, "total": total, "pages": pages }
    })
}
