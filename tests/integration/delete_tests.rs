//! Delete endpoint integration tests.
//!
//! Tests verify:
//! - Files and effectively empty folders are deleted
//! - Folders with real content and unsafe paths are skipped with a warning
//! - Authorization covers the whole request
//! - Parameters are read from the body and the query string
//! - Redirects carry the folder and the embedded view parameters

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use media_manager::server::{ACTOR_HEADER, DELETE_BODY_LIMIT, TOKEN_HEADER};

use super::test_utils::{
    delete_request, location, location_path, messages, query_value, token_for, TestEnv, EDITOR,
    PROTECTED, UPLOADER,
};

// =============================================================================
// Successful Deletes
// =============================================================================

#[tokio::test]
async fn test_delete_single_file() {
    let env = TestEnv::new();
    env.seed("old.jpg", b"x");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(EDITOR, &["old.jpg"], &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_path(&response), "/media");
    assert_eq!(query_value(&response, "folder").as_deref(), Some(""));
    assert_eq!(
        messages(&response),
        vec![(
            "info".to_string(),
            "Delete of \"/old.jpg\" complete.".to_string()
        )]
    );
    assert!(!env.exists("old.jpg"));
}

#[tokio::test]
async fn test_delete_in_folder() {
    let env = TestEnv::new();
    env.seed("images/a.jpg", b"a");
    env.seed("images/b.jpg", b"b");
    env.seed("images/keep.jpg", b"k");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(
            EDITOR,
            &["a.jpg", "b.jpg"],
            &[("folder", "images")],
        ))
        .await
        .unwrap();

    assert_eq!(query_value(&response, "folder").as_deref(), Some("images"));
    let texts: Vec<String> = messages(&response).into_iter().map(|(_, t)| t).collect();
    assert_eq!(
        texts,
        vec![
            "Delete of \"/images/a.jpg\" complete.",
            "Delete of \"/images/b.jpg\" complete.",
        ]
    );
    assert!(!env.exists("images/a.jpg"));
    assert!(!env.exists("images/b.jpg"));
    assert!(env.exists("images/keep.jpg"));
}

#[tokio::test]
async fn test_delete_folder_holding_only_ignored_entries() {
    let env = TestEnv::new();
    env.seed("empty/.DS_Store", b"");
    env.seed("empty/nested/index.html", b"<html></html>");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(EDITOR, &["empty"], &[]))
        .await
        .unwrap();

    assert_eq!(messages(&response)[0].0, "info");
    assert!(!env.exists("empty"));
}

#[tokio::test]
async fn test_missing_entry_is_silently_skipped() {
    let env = TestEnv::new();

    let response = env
        .router
        .clone()
        .oneshot(delete_request(EDITOR, &["ghost.jpg"], &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(messages(&response).is_empty());
}

// =============================================================================
// Skipped Entries
// =============================================================================

#[tokio::test]
async fn test_non_empty_folder_kept_with_warning() {
    let env = TestEnv::new();
    env.seed("full/photo.jpg", b"x");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(EDITOR, &["full"], &[]))
        .await
        .unwrap();

    assert_eq!(
        messages(&response),
        vec![(
            "warning".to_string(),
            "Unable to delete \"/full\": folder is not empty.".to_string()
        )]
    );
    assert!(env.exists("full/photo.jpg"));
}

#[tokio::test]
async fn test_unsafe_path_skipped_others_deleted() {
    let env = TestEnv::new();
    env.seed("docs/a.txt", b"a");
    env.seed("docs/sub/inner.txt", b"i");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(
            EDITOR,
            &["../outside.txt", "sub/inner.txt", "a.txt"],
            &[("folder", "docs")],
        ))
        .await
        .unwrap();

    let found = messages(&response);
    assert_eq!(found.len(), 3);
    assert_eq!(found[0].0, "warning");
    assert_eq!(found[1].0, "warning");
    assert_eq!(found[2].0, "info");
    assert!(!env.exists("docs/a.txt"));
    assert!(env.exists("docs/sub/inner.txt"));
}

#[tokio::test]
async fn test_unsafe_folder_rejected() {
    let env = TestEnv::new();
    env.seed("a.jpg", b"x");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(EDITOR, &["a.jpg"], &[("folder", "../")]))
        .await
        .unwrap();

    assert_eq!(messages(&response)[0].0, "warning");
    assert_eq!(query_value(&response, "folder").as_deref(), Some(""));
    assert!(env.exists("a.jpg"));
}

#[tokio::test]
async fn test_protected_name_vetoed() {
    let env = TestEnv::new();
    env.seed(PROTECTED, b"png");
    env.seed("other.png", b"png");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(EDITOR, &[PROTECTED, "other.png"], &[]))
        .await
        .unwrap();

    let found = messages(&response);
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].0, "warning");
    assert!(found[0].1.contains("cannot be deleted"));
    assert_eq!(found[1].0, "info");
    assert!(env.exists(PROTECTED));
    assert!(!env.exists("other.png"));
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_actor_without_delete_grant() {
    let env = TestEnv::new();
    env.seed("a.jpg", b"x");
    env.seed("b.jpg", b"x");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(UPLOADER, &["a.jpg", "b.jpg"], &[]))
        .await
        .unwrap();

    assert_eq!(
        messages(&response),
        vec![("warning".to_string(), "Delete not permitted.".to_string())]
    );
    assert!(env.exists("a.jpg"));
    assert!(env.exists("b.jpg"));
}

#[tokio::test]
async fn test_empty_request_needs_no_grant() {
    let env = TestEnv::new();

    let response = env
        .router
        .clone()
        .oneshot(delete_request(UPLOADER, &[], &[("folder", "images")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(query_value(&response, "folder").as_deref(), Some("images"));
    assert!(messages(&response).is_empty());
}

#[tokio::test]
async fn test_empty_request_ignores_unsafe_folder() {
    let env = TestEnv::new();
    env.seed("a.jpg", b"x");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(EDITOR, &[], &[("folder", "../x")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(query_value(&response, "folder").as_deref(), Some(""));
    assert!(messages(&response).is_empty());
    assert!(env.exists("a.jpg"));
}

// =============================================================================
// Parameters and Redirects
// =============================================================================

#[tokio::test]
async fn test_component_view_redirect() {
    let env = TestEnv::new();
    env.seed("a.jpg", b"x");

    let response = env
        .router
        .clone()
        .oneshot(delete_request(EDITOR, &["a.jpg"], &[("tmpl", "component")]))
        .await
        .unwrap();

    assert!(location(&response).starts_with("/media?folder=&view=mediaList&tmpl=component"));
    assert_eq!(query_value(&response, "view").as_deref(), Some("mediaList"));
    assert_eq!(query_value(&response, "tmpl").as_deref(), Some("component"));
}

#[tokio::test]
async fn test_paths_from_query_string() {
    let env = TestEnv::new();
    env.seed("docs/q.txt", b"q");

    let request = Request::builder()
        .method("POST")
        .uri("/media/delete?folder=docs&rm%5B%5D=q.txt")
        .header(ACTOR_HEADER, EDITOR)
        .header(TOKEN_HEADER, token_for(EDITOR))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::empty())
        .unwrap();

    let response = env.router.clone().oneshot(request).await.unwrap();

    assert_eq!(query_value(&response, "folder").as_deref(), Some("docs"));
    assert_eq!(messages(&response)[0].0, "info");
    assert!(!env.exists("docs/q.txt"));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let env = TestEnv::new();
    env.seed("a.jpg", b"x");

    let mut body = String::from("rm%5B%5D=a.jpg");
    while body.len() <= DELETE_BODY_LIMIT {
        body.push_str("&rm%5B%5D=padding-entry.jpg");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/media/delete")
        .header(ACTOR_HEADER, EDITOR)
        .header(TOKEN_HEADER, token_for(EDITOR))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = env.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(env.exists("a.jpg"));
}
