mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use blog_api::{init_db, SqliteStore, UserStore};
use common::spawn_app;

fn valid_user() -> Value {
    json!({
        "user": {
            "name": "John Doe",
            "email": "john@example.com",
            "password": "password123",
            "image": "https://example.com/image.jpg"
        }
    })
}

async fn errors_of(response: reqwest::Response) -> Vec<String> {
    let body: Value = response.json().await.unwrap();
    serde_json::from_value(body["errors"].clone()).unwrap()
}

#[tokio::test]
async fn signup_creates_user_and_returns_token() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.api("/auth/signup"))
        .json(&valid_user())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["email"], "john@example.com");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["user"].get("password_digest").is_none());
}

#[tokio::test]
async fn signup_rejects_invalid_email_and_short_password() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.api("/auth/signup"))
        .json(&json!({
            "user": {
                "name": "John Doe",
                "email": "invalid-email",
                "password": "12345",
                "image": "https://example.com/image.jpg"
            }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors = errors_of(response).await;
    assert!(errors.contains(&"Email is invalid".to_owned()));
    assert!(errors.contains(&"Password is too short (minimum is 6 characters)".to_owned()));
}

#[tokio::test]
async fn signup_reports_missing_fields() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.api("/auth/signup"))
        .json(&json!({ "user": { "email": "test@example.com" } }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors = errors_of(response).await;
    assert!(errors.contains(&"Name can't be blank".to_owned()));
    assert!(errors.contains(&"Image can't be blank".to_owned()));
}

#[tokio::test]
async fn signup_rejects_duplicate_email() {
    let app = spawn_app().await;
    app.signup("John Doe", "john@example.com").await;

    let response = app
        .client
        .post(app.api("/auth/signup"))
        .json(&valid_user())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors = errors_of(response).await;
    assert!(errors.contains(&"Email has already been taken".to_owned()));
}

#[tokio::test]
async fn login_returns_token_for_valid_credentials() {
    let app = spawn_app().await;
    let user = app.signup("Test", "test@example.com").await;

    let response = app
        .client
        .post(app.api("/auth/login"))
        .json(&json!({ "email": "test@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["id"], user.id);
    assert!(body["token"].as_str().is_some());
    assert!(body["user"].get("password_digest").is_none());
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = spawn_app().await;
    app.signup("Test", "test@example.com").await;

    for body in [
        json!({ "email": "test@example.com", "password": "wrong_password" }),
        json!({ "email": "nonexistent@example.com", "password": "password123" }),
        json!({}),
    ] {
        let response = app
            .client
            .post(app.api("/auth/login"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid email or password");
    }
}

#[tokio::test]
async fn protected_routes_require_valid_token() {
    let app = spawn_app().await;

    let missing = app.client.get(app.api("/posts")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let invalid = app
        .client
        .get(app.api("/posts"))
        .bearer_auth("invalid_token")
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    let body: Value = invalid.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn health_check_is_public() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/up")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn token_of_deleted_user_is_rejected() {
    let app = spawn_app().await;
    let user = app.signup("Gone", "gone@example.com").await;
    assert_eq!(app.get(&user, "/posts").await.status(), StatusCode::OK);

    let store = SqliteStore::new(init_db(&app.database_url).await.unwrap());
    assert!(store.delete_user(user.id).await.unwrap());

    let response = app.get(&user, "/posts").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn malformed_signup_body_gets_json_error() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.api("/auth/signup"))
        .header("content-type", "application/json")
        .body("{\"user\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_owned();
    assert!(content_type.starts_with("application/json"));
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}
