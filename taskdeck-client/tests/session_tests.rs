/// Integration tests for the session manager
///
/// Each test runs against its own mock API with in-memory session storage.

mod common;

use common::*;
use serde_json::json;
use std::time::Duration;
use taskdeck_client::session::{SessionEvent, SessionStatus};
use taskdeck_shared::models::{LoginCredentials, RegisterData, RegistrationForm};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn credentials() -> LoginCredentials {
    LoginCredentials {
        email: "ada@example.com".to_string(),
        password: "secret1".to_string(),
    }
}

#[tokio::test]
async fn test_restore_without_token_skips_network() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(user_json())))
        .expect(0)
        .mount(&ctx.server)
        .await;

    assert_eq!(ctx.app.session.status(), SessionStatus::Uninitialized);
    ctx.app.session.restore().await;

    assert_eq!(ctx.app.session.status(), SessionStatus::Anonymous);
    assert!(ctx.app.session.is_ready());
    assert!(ctx.app.session.current_user().is_none());
}

#[tokio::test]
async fn test_restore_with_valid_token() {
    let ctx = TestContext::signed_in().await;
    let mut events = ctx.app.session.subscribe();

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", BEARER))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({
            "id": "u1",
            "name": "Ada King",
            "email": "ada@example.com",
            "role": "admin",
            "createdAt": "2026-01-01T00:00:00Z"
        }))))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app.session.restore().await;

    assert_eq!(ctx.app.session.status(), SessionStatus::Authenticated);
    let user = ctx.app.session.current_user().unwrap();
    assert_eq!(user.name, "Ada King");
    assert!(user.is_admin());

    // The fresh record replaces the persisted one
    assert_eq!(ctx.stored_user().unwrap().name, "Ada King");
    assert_eq!(ctx.stored_token().as_deref(), Some(TOKEN));

    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::SignedIn {
            user_id: "u1".to_string()
        }
    );
}

#[tokio::test]
async fn test_restore_with_rejected_token_clears_session() {
    let ctx = TestContext::signed_in().await;
    let mut events = ctx.app.session.subscribe();

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(failure("Token expired")))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app.session.restore().await;

    assert_eq!(ctx.app.session.status(), SessionStatus::Anonymous);
    assert!(ctx.app.session.current_user().is_none());
    assert!(ctx.stored_token().is_none());
    assert!(ctx.stored_user().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoginRequired);
}

#[tokio::test]
async fn test_restore_with_server_error_clears_session() {
    let ctx = TestContext::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(500).set_body_json(failure("Database unavailable")))
        .mount(&ctx.server)
        .await;

    ctx.app.session.restore().await;

    assert_eq!(ctx.app.session.status(), SessionStatus::Anonymous);
    assert!(ctx.stored_token().is_none());
    assert!(ctx.stored_user().is_none());
}

#[tokio::test]
async fn test_restore_runs_once() {
    let ctx = TestContext::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(user_json())))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app.session.restore().await;
    ctx.app.session.restore().await;

    assert!(ctx.app.session.is_authenticated());
}

#[tokio::test]
async fn test_spawn_restore_and_wait_until_ready() {
    let ctx = TestContext::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(user_json()))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&ctx.server)
        .await;

    let handle = ctx.app.session.spawn_restore();
    ctx.app.session.wait_until_ready().await;

    assert!(ctx.app.session.is_ready());
    assert_eq!(ctx.app.session.status(), SessionStatus::Authenticated);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_login_success_persists_session() {
    let ctx = TestContext::new().await;
    ctx.app.session.restore().await;
    let mut events = ctx.app.session.subscribe();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "ada@example.com", "password": "secret1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_ok("fresh-token")))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let user = ctx.app.session.login(&credentials()).await.unwrap();

    assert_eq!(user.email, "ada@example.com");
    assert_eq!(ctx.app.session.status(), SessionStatus::Authenticated);
    assert_eq!(ctx.app.session.current_user(), Some(user.clone()));
    assert_eq!(ctx.stored_token().as_deref(), Some("fresh-token"));
    assert_eq!(ctx.stored_user(), Some(user));
    assert!(!ctx.app.session.is_loading());
    assert!(ctx.app.session.error().is_none());
    assert!(matches!(events.try_recv().unwrap(), SessionEvent::SignedIn { .. }));
}

#[tokio::test]
async fn test_login_then_requests_carry_token() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_ok("fresh-token")))
        .mount(&ctx.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tasks/stats"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({ "total": 0, "byStatus": [] }))))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app.session.login(&credentials()).await.unwrap();
    let stats = ctx.app.tasks.stats().await.unwrap();
    assert_eq!(stats.total, 0);
}

#[tokio::test]
async fn test_login_failure_surfaces_server_message() {
    let ctx = TestContext::new().await;
    ctx.app.session.restore().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(failure("Invalid credentials")))
        .mount(&ctx.server)
        .await;

    let err = ctx.app.session.login(&credentials()).await.unwrap_err();

    assert_eq!(err.message, "Invalid credentials");
    assert_eq!(err.status(), Some(400));
    assert_eq!(ctx.app.session.error().as_deref(), Some("Invalid credentials"));
    assert!(!ctx.app.session.is_authenticated());
    assert!(!ctx.app.session.is_loading());
    assert!(ctx.stored_token().is_none());
}

#[tokio::test]
async fn test_login_failure_without_message_uses_fallback() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    let err = ctx.app.session.login(&credentials()).await.unwrap_err();

    assert_eq!(err.message, "Failed to log in");
    assert_eq!(ctx.app.session.error().as_deref(), Some("Failed to log in"));
}

#[tokio::test]
async fn test_login_rejected_in_body() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(failure("Account disabled")))
        .mount(&ctx.server)
        .await;

    let err = ctx.app.session.login(&credentials()).await.unwrap_err();

    assert_eq!(err.message, "Account disabled");
    assert!(!ctx.app.session.is_authenticated());
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let ctx = TestContext::authenticated().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(failure("Invalid credentials")))
        .mount(&ctx.server)
        .await;

    ctx.app.session.login(&credentials()).await.unwrap_err();

    assert!(ctx.app.session.is_authenticated());
    assert_eq!(ctx.stored_token().as_deref(), Some(TOKEN));
}

#[tokio::test]
async fn test_register_success_establishes_session() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "password": "secret1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_ok("new-token")))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let data = RegisterData {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password: "secret1".to_string(),
    };
    let user = ctx.app.session.register(&data).await.unwrap();

    assert_eq!(user.name, "Ada Lovelace");
    assert!(ctx.app.session.is_authenticated());
    assert_eq!(ctx.stored_token().as_deref(), Some("new-token"));
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(failure("User already exists")))
        .mount(&ctx.server)
        .await;

    let form = RegistrationForm {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret1".to_string(),
    };
    let err = ctx.app.session.register_form(form).await.unwrap_err();

    assert_eq!(err.message, "User already exists");
    assert!(!ctx.app.session.is_authenticated());
}

#[tokio::test]
async fn test_register_form_mismatch_never_reaches_server() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_ok("new-token")))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let form = RegistrationForm {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        password: "secret1".to_string(),
        confirm_password: "secret2".to_string(),
    };
    let err = ctx.app.session.register_form(form).await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(err.message, "Passwords do not match");
}

#[tokio::test]
async fn test_logout_clears_session_and_is_idempotent() {
    let ctx = TestContext::authenticated().await;
    let mut events = ctx.app.session.subscribe();

    ctx.app.session.logout().unwrap();

    assert!(!ctx.app.session.is_authenticated());
    assert_eq!(ctx.app.session.status(), SessionStatus::Anonymous);
    assert!(ctx.stored_token().is_none());
    assert!(ctx.stored_user().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);

    ctx.app.session.logout().unwrap();
    assert!(!ctx.app.session.is_authenticated());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_status_watch_reports_transitions() {
    let ctx = TestContext::new().await;
    let mut status = ctx.app.session.subscribe_status();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_ok(TOKEN)))
        .mount(&ctx.server)
        .await;

    ctx.app.session.restore().await;
    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), SessionStatus::Anonymous);

    ctx.app.session.login(&credentials()).await.unwrap();
    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn test_logout_during_restore_wins() {
    let ctx = TestContext::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(user_json()))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let handle = ctx.app.session.spawn_restore();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ctx.app.session.status(), SessionStatus::Restoring);

    ctx.app.session.logout().unwrap();
    handle.await.unwrap();

    assert!(!ctx.app.session.is_authenticated());
    assert!(ctx.app.session.current_user().is_none());
    assert_eq!(ctx.app.session.status(), SessionStatus::Anonymous);
    assert!(ctx.stored_token().is_none());
    assert!(ctx.stored_user().is_none());
}

#[tokio::test]
async fn test_login_during_restore_wins() {
    let ctx = TestContext::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(user_json()))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&ctx.server)
        .await;

    let bob = json!({
        "id": "u2",
        "name": "Bob",
        "email": "bob@example.com",
        "role": "user",
        "createdAt": "2026-01-02T00:00:00Z"
    });
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(json!({ "user": bob, "token": "bob-token" }))),
        )
        .mount(&ctx.server)
        .await;

    let handle = ctx.app.session.spawn_restore();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let bob_credentials = LoginCredentials {
        email: "bob@example.com".to_string(),
        password: "secret2".to_string(),
    };
    ctx.app.session.login(&bob_credentials).await.unwrap();
    handle.await.unwrap();

    assert_eq!(ctx.app.session.status(), SessionStatus::Authenticated);
    assert_eq!(ctx.app.session.current_user().unwrap().id, "u2");
    assert_eq!(ctx.stored_user().unwrap().id, "u2");
    assert_eq!(ctx.stored_token().as_deref(), Some("bob-token"));
}
