//! Signup, login and the bearer-protected `/api/auth/me`.

mod common;

use api_lib::web::auth::{issue_token, verify_token};
use axum::http::{Method, StatusCode};
use common::{app, bearer_request, json_request, send, TEST_JWT_SECRET};
use serde_json::{json, Value};
use uuid::Uuid;

async fn signup_ada(router: &axum::Router) -> (StatusCode, Value) {
    send(
        router,
        json_request(
            Method::POST,
            "/api/auth/signup",
            Some(json!({"username": "ada", "email": "ada@x.com", "password": "secret1"})),
        ),
    )
    .await
}

#[tokio::test]
async fn signup_returns_token_and_public_user() {
    let app = app();
    let (status, body) = signup_ada(&app.router).await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    let token = body["token"].as_str().unwrap();
    let user_id = verify_token(token, TEST_JWT_SECRET).unwrap();
    assert_eq!(body["user"]["id"], user_id.to_string());
    assert_eq!(body["user"]["username"], "ada");
    assert_eq!(body["user"]["email"], "ada@x.com");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("hashed_password").is_none());

    let stored = app.db.stored_password_hash("ada@x.com").unwrap();
    assert_ne!(stored, "secret1");
}

#[tokio::test]
async fn signup_rejects_missing_fields_and_short_passwords() {
    let app = app();

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/signup",
            Some(json!({"username": "ada", "email": "ada@x.com"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please enter all fields");

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/signup",
            Some(json!({"username": "ada", "email": "ada@x.com", "password": "12345"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password must be at least 6 characters");
}

#[tokio::test]
async fn duplicate_signup_is_rejected() {
    let app = app();
    signup_ada(&app.router).await;

    let (status, body) = signup_ada(&app.router).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User with this email or username already exists");
}

#[tokio::test]
async fn login_checks_user_and_password() {
    let app = app();
    signup_ada(&app.router).await;

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"email": "ada@x.com", "password": "secret1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["username"], "ada");

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"email": "ada@x.com", "password": "wrong-password"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = send(
        &app.router,
        json_request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"email": "grace@x.com", "password": "secret1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User does not exist");
}

#[tokio::test]
async fn me_returns_the_token_owner() {
    let app = app();
    let (_, signup) = signup_ada(&app.router).await;
    let token = signup["token"].as_str().unwrap();

    let (status, body) = send(&app.router, bearer_request("/api/auth/me", token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, signup["user"]);
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let app = app();

    let (status, body) = send(&app.router, json_request(Method::GET, "/api/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token, authorization denied");

    let (status, body) = send(&app.router, bearer_request("/api/auth/me", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token is not valid");

    let foreign = issue_token(Uuid::new_v4(), "another-secret").unwrap();
    let (status, _) = send(&app.router, bearer_request("/api/auth/me", &foreign)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_unknown_user_is_not_valid() {
    let app = app();
    let token = issue_token(Uuid::new_v4(), TEST_JWT_SECRET).unwrap();

    let (status, body) = send(&app.router, bearer_request("/api/auth/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token is not valid");
}
