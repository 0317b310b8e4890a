use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, body, body::MessageBody, test, web};
use serde_json::{Value, json};

use crate::application::advice_ledger::AdviceLedger;
use crate::application::auth_service::AuthService;
use crate::application::user_directory::UserDirectory;
use crate::data::snapshot_store::{MemoryBackend, SnapshotStore};
use crate::infrastructure::security::{AdminKeyValidator, JwtKeys, PasswordHasher};
use crate::utils::configure_api;

fn services() -> (AuthService, AdviceLedger) {
    let store = Arc::new(SnapshotStore::new(MemoryBackend::new()));
    let timeout = Duration::from_secs(2);
    let directory = UserDirectory::new(store.clone(), PasswordHasher::new(), timeout);
    let auth = AuthService::new(
        directory,
        AdminKeyValidator::new(Some("12283ARA".into())),
        JwtKeys::new("handler-test-secret".into()),
    );
    (auth, AdviceLedger::new(store, timeout))
}

macro_rules! app {
    () => {{
        let (auth, ledger) = services();
        let keys = auth.keys().clone();
        test::init_service(
            App::new()
                .app_data(web::Data::new(auth))
                .app_data(web::Data::new(ledger))
                .configure(|cfg| configure_api(cfg, keys)),
        )
        .await
    }};
}

/// Errors raised by middleware come back as `Err`; render them the same
/// way the server would.
async fn send<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, bytes) = match test::try_call_service(app, req).await {
        Ok(res) => {
            let status = res.status();
            (status, test::read_body(res).await)
        }
        Err(err) => {
            let res = err.error_response();
            let status = res.status();
            (status, body::to_bytes(res.into_body()).await.unwrap_or_default())
        }
    };
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn register<S, B>(app: &S, email: &str) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"name": "Ann", "email": email, "password": "secret1"}))
        .to_request();
    send(app, req).await
}

async fn token_for<S, B>(app: &S, email: &str) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    register(app, email).await;
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"email": email, "password": "secret1"}))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    body["accessToken"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn health_reports_ok() {
    let app = app!();
    let req = test::TestRequest::get().uri("/api/health").to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn register_returns_public_user() {
    let app = app!();
    let (status, body) = register(&app, "ann@x.com").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "ann@x.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("salt").is_none());
}

#[actix_web::test]
async fn register_with_admin_key_ignores_case() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "name": "Root",
            "email": "root@x.com",
            "password": "secret1",
            "adminKey": "12283ara"
        }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "admin");
}

#[actix_web::test]
async fn duplicate_register_conflicts() {
    let app = app!();
    register(&app, "ann@x.com").await;
    let (status, body) = register(&app, "ann@x.com").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_email");
}

#[actix_web::test]
async fn register_rejects_short_password() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"name": "Bob", "email": "bob@x.com", "password": "12345"}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "password_too_short");
}

#[actix_web::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = app!();
    register(&app, "ann@x.com").await;
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"email": "ann@x.com", "password": "nope123"}))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_credentials");
}

#[actix_web::test]
async fn login_issues_bearer_token() {
    let app = app!();
    register(&app, "ann@x.com").await;
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"email": "ann@x.com", "password": "secret1"}))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 86_400);
    assert!(body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["name"], "Ann");
}

#[actix_web::test]
async fn create_advice_requires_token() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/advices")
        .set_json(json!({"category": "life", "question": "Q", "answer": "A"}))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

#[actix_web::test]
async fn create_advice_rejects_garbage_token() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/advices")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .set_json(json!({"category": "life", "question": "Q", "answer": "A"}))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn advices_can_be_added_and_filtered() {
    let app = app!();
    let token = token_for(&app, "ann@x.com").await;

    for (category, question) in [("study", "How to focus?"), ("life", "How to rest?")] {
        let req = test::TestRequest::post()
            .uri("/api/advices")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({"category": category, "question": question, "answer": "Slowly."}))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["category"], category);
        assert!(body["authorId"].is_string());
    }

    let req = test::TestRequest::get()
        .uri("/api/advices?category=study")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["advices"][0]["question"], "How to focus?");

    let req = test::TestRequest::get().uri("/api/advices").to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["advices"][0]["question"], "How to rest?");
}

#[actix_web::test]
async fn unknown_category_is_rejected() {
    let app = app!();
    let req = test::TestRequest::get()
        .uri("/api/advices?category=cooking")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_category");
}

#[actix_web::test]
async fn blank_question_is_rejected() {
    let app = app!();
    let token = token_for(&app, "ann@x.com").await;
    let req = test::TestRequest::post()
        .uri("/api/advices")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({"category": "study", "question": "   ", "answer": "A"}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "empty_field");
}

#[actix_web::test]
async fn profile_can_be_read_and_updated() {
    let app = app!();
    let token = token_for(&app, "ann@x.com").await;

    let req = test::TestRequest::get()
        .uri("/api/users/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ann@x.com");

    let req = test::TestRequest::put()
        .uri("/api/users/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({"name": "Annie", "image": "https://img.example/a.png"}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Annie");
    assert_eq!(body["image"], "https://img.example/a.png");
    assert_eq!(body["email"], "ann@x.com");
}

#[actix_web::test]
async fn unknown_routes_are_not_found_rather_than_unauthorized() {
    let app = app!();

    let req = test::TestRequest::get().uri("/api/no-such-route").to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/users/someone").to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete().uri("/api/advices").to_request();
    let (status, _) = send(&app, req).await;
    assert_ne!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn profile_requires_token() {
    let app = app!();
    let req = test::TestRequest::get().uri("/api/users/me").to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}
