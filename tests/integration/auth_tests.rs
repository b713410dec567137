//! Request token integration tests.
//!
//! Tests verify:
//! - Valid tokens in the header or query string are accepted
//! - Missing, malformed and foreign tokens are rejected with 403
//! - Rejected requests have no side effects
//! - The health endpoint needs no token

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use media_manager::server::{ACTOR_HEADER, TOKEN_HEADER};

use super::test_utils::{
    files_in, token_for, upload_request_with_token, MultipartBuilder, TestEnv, EDITOR, UPLOADER,
};

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Accepted Tokens
// =============================================================================

#[tokio::test]
async fn test_header_token_accepted() {
    let env = TestEnv::new();
    let body = MultipartBuilder::new().upload("a.jpg", b"x").build();
    let token = token_for(EDITOR);

    let response = env
        .router
        .clone()
        .oneshot(upload_request_with_token(EDITOR, Some(&token), "", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(env.exists("a.jpg"));
}

#[tokio::test]
async fn test_query_token_accepted() {
    let env = TestEnv::new();
    env.seed("old.jpg", b"x");

    let request = Request::builder()
        .method("POST")
        .uri(format!("/media/delete?token={}&rm%5B%5D=old.jpg", token_for(EDITOR)))
        .header(ACTOR_HEADER, EDITOR)
        .body(Body::empty())
        .unwrap();

    let response = env.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!env.exists("old.jpg"));
}

// =============================================================================
// Rejected Tokens
// =============================================================================

#[tokio::test]
async fn test_missing_token_rejected() {
    let env = TestEnv::new();
    let body = MultipartBuilder::new().upload("a.jpg", b"x").build();

    let response = env
        .router
        .clone()
        .oneshot(upload_request_with_token(EDITOR, None, "", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = json_body(response).await;
    assert_eq!(json["error"], "token_invalid");
    assert_eq!(json["status"], 403);
    assert!(!env.exists("a.jpg"));
    assert!(files_in(&env.staging).is_empty());
}

#[tokio::test]
async fn test_token_of_other_actor_rejected() {
    let env = TestEnv::new();
    let body = MultipartBuilder::new().upload("a.jpg", b"x").build();
    let token = token_for(UPLOADER);

    let response = env
        .router
        .clone()
        .oneshot(upload_request_with_token(EDITOR, Some(&token), "", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!env.exists("a.jpg"));
}

#[tokio::test]
async fn test_malformed_token_rejected() {
    let env = TestEnv::new();
    let body = MultipartBuilder::new().upload("a.jpg", b"x").build();

    let response = env
        .router
        .clone()
        .oneshot(upload_request_with_token(EDITOR, Some("zz-not-hex"), "", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_actor_rejected() {
    let env = TestEnv::new();
    env.seed("keep.jpg", b"x");

    let request = Request::builder()
        .method("POST")
        .uri("/media/delete")
        .header(TOKEN_HEADER, token_for(EDITOR))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("rm[]=keep.jpg"))
        .unwrap();

    let response = env.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(env.exists("keep.jpg"));
}

// =============================================================================
// Public Routes
// =============================================================================

#[tokio::test]
async fn test_health_needs_no_token() {
    let env = TestEnv::new();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = env.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["listeners"][0], "audit");
    assert_eq!(json["listeners"][1], "protected-names");
}
