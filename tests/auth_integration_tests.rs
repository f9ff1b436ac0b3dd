mod common;

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{Request, StatusCode},
};
use common::{ADMIN_TOKEN, MultipartBody, TestApp, body_json};
use enrollment_intake::{AppConfig, AppError, auth::AdminAccess};
use serde_json::json;
use tower::util::ServiceExt;

fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("x-admin-token", token);
    }
    builder.body(Body::empty()).unwrap()
}

async fn seed_one(app: &TestApp) {
    let response = app
        .router
        .clone()
        .oneshot(MultipartBody::new().text("studentID", "S1").into_request("/submit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_list_without_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/students", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn test_wrong_tokens_are_unauthorized() {
    let app = TestApp::spawn().await;
    let near_misses = [
        "wrong",
        "TEST-ADMIN-TOKEN",
        "test-admin-token ",
        "test-admin-toke",
        "test-admin-token-extra",
    ];

    for token in near_misses {
        let response = app
            .router
            .clone()
            .oneshot(request("GET", "/api/students", Some(token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "token {token:?}");
    }
}

#[tokio::test]
async fn test_header_token_is_accepted() {
    let app = TestApp::spawn().await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/students", Some(ADMIN_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_query_token_is_accepted() {
    let app = TestApp::spawn().await;

    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/students?token={ADMIN_TOKEN}"),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_query_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/students?token=nope", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unauthorized_delete_leaves_record() {
    let app = TestApp::spawn().await;
    seed_one(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(request("DELETE", "/api/students/1", Some("guess")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(app.state.repo.list_students().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_token_is_checked_before_the_path() {
    let app = TestApp::spawn().await;

    let response = app
        .router
        .clone()
        .oneshot(request("DELETE", "/api/students/not-a-number", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));

    let response = app
        .router
        .clone()
        .oneshot(request("DELETE", "/api/students/not-a-number", Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let app = TestApp::spawn().await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/ping", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    seed_one(&app).await;
}

#[tokio::test]
async fn test_extractor_directly() {
    let config = AppConfig {
        admin_token: "s3cret".to_string(),
        ..AppConfig::default()
    };

    let (mut parts, _) = request("GET", "/api/students", Some("s3cret")).into_parts();
    assert!(AdminAccess::from_request_parts(&mut parts, &config).await.is_ok());

    let (mut parts, _) = request("GET", "/api/students", Some("s3cre")).into_parts();
    let rejection = AdminAccess::from_request_parts(&mut parts, &config)
        .await
        .unwrap_err();
    assert!(matches!(rejection, AppError::Unauthorized));
}
