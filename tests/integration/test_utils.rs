//! Shared helpers for the integration tests.
//!
//! Provides a temporary media root wired into a real router, a small
//! multipart body builder, and helpers to read redirect messages back.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use tempfile::TempDir;
use url::form_urlencoded;

use media_manager::controller::UploadLimits;
use media_manager::media::{
    AuditListener, EventContext, EventListener, ListenerOutcome, MediaEvent, MediaStore,
    ProtectedNames, MEDIA_COMPONENT,
};
use media_manager::server::{ACTOR_HEADER, TOKEN_HEADER};
use media_manager::{
    create_router, EventDispatcher, ExtensionPolicy, GrantTable, LocalMediaStore, MediaController,
    MediaError, RequestTokens, RouterConfig,
};

pub const TEST_SECRET: &str = "test-secret-key-for-request-tokens";

/// Holds `core.create` and `core.delete`.
pub const EDITOR: &str = "alice";

/// Holds `core.create` only.
pub const UPLOADER: &str = "bob";

/// Holds nothing.
pub const VISITOR: &str = "eve";

/// Name vetoed by the protected-names listener.
pub const PROTECTED: &str = "logo.png";

const BOUNDARY: &str = "----media-test-boundary";

// =============================================================================
// Test Environment
// =============================================================================

/// A media root, staging directory and router over them.
pub struct TestEnv {
    _dir: TempDir,
    pub base: PathBuf,
    pub staging: PathBuf,
    pub router: Router,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_limits(UploadLimits::default())
    }

    pub fn with_limits(limits: UploadLimits) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("media");
        let staging = dir.path().join("staging");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::create_dir_all(&staging).unwrap();

        let grants = GrantTable::from_specs(
            MEDIA_COMPONENT,
            [
                format!("{}=create,delete", EDITOR),
                format!("{}=create", UPLOADER),
            ],
        )
        .unwrap();

        let events = EventDispatcher::new()
            .with_listener(AuditListener)
            .with_listener(ProtectedNames::new([PROTECTED]));

        let controller = MediaController::new(&base, LocalMediaStore::new(), Arc::new(grants))
            .with_events(events)
            .with_filter(Arc::new(ExtensionPolicy::default()))
            .with_limits(limits);

        let router = create_router(
            controller,
            RouterConfig::new(TEST_SECRET, &staging).with_tracing(false),
        );

        Self {
            _dir: dir,
            base,
            staging,
            router,
        }
    }

    /// Create a file (and its parents) under the media root.
    pub fn seed(&self, relative: &str, content: &[u8]) {
        let path = self.base.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.base.join(relative).exists()
    }
}

// =============================================================================
// Mock Store
// =============================================================================

/// A [`LocalMediaStore`] whose writes fail for selected file names.
///
/// `move_file` fails when the destination name matches; `delete_file` and
/// `delete_dir_recursive` fail when the deleted entry's name matches. Every
/// other call is passed through.
#[derive(Debug, Clone, Default)]
pub struct FailingStore {
    inner: LocalMediaStore,
    failing: HashSet<String>,
}

impl FailingStore {
    pub fn new<I, T>(failing: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            inner: LocalMediaStore::new(),
            failing: failing.into_iter().map(Into::into).collect(),
        }
    }

    fn check(&self, path: &Path) -> Result<(), MediaError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.contains(&name) {
            Err(MediaError::Io(format!("simulated failure for {}", name)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MediaStore for FailingStore {
    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path).await
    }

    async fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path).await
    }

    async fn move_file(&self, src: &Path, dst: &Path) -> Result<(), MediaError> {
        self.check(dst)?;
        self.inner.move_file(src, dst).await
    }

    async fn delete_file(&self, path: &Path) -> Result<(), MediaError> {
        self.check(path)?;
        self.inner.delete_file(path).await
    }

    async fn delete_dir_recursive(&self, path: &Path) -> Result<(), MediaError> {
        self.check(path)?;
        self.inner.delete_dir_recursive(path).await
    }

    async fn list_files_recursive(
        &self,
        path: &Path,
        exclude: &[&str],
    ) -> Result<Vec<PathBuf>, MediaError> {
        self.inner.list_files_recursive(path, exclude).await
    }
}

// =============================================================================
// Recording Listener
// =============================================================================

/// Records every hook call as `hook:context:path` and vetoes folder deletes
/// when asked to.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    calls: Arc<Mutex<Vec<String>>>,
    veto_folders: bool,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vetoing_folders() -> Self {
        Self {
            veto_folders: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, hook: &str, context: EventContext, event: &MediaEvent) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", hook, context, event.relative_path));
    }
}

impl EventListener for RecordingListener {
    fn name(&self) -> &str {
        "recording"
    }

    fn before_save(&self, context: EventContext, event: &MediaEvent) -> ListenerOutcome {
        self.record("before_save", context, event);
        ListenerOutcome::proceed()
    }

    fn after_save(&self, context: EventContext, event: &MediaEvent) {
        self.record("after_save", context, event);
    }

    fn before_delete(&self, context: EventContext, event: &MediaEvent) -> ListenerOutcome {
        self.record("before_delete", context, event);
        if self.veto_folders && context == EventContext::Folder {
            ListenerOutcome::veto("folders are locked")
        } else {
            ListenerOutcome::proceed()
        }
    }

    fn after_delete(&self, context: EventContext, event: &MediaEvent) {
        self.record("after_delete", context, event);
    }
}

/// Controller over `base` with `store`, granting [`EDITOR`] everything.
pub fn editor_controller<St: MediaStore>(
    base: &Path,
    store: St,
    listener: RecordingListener,
) -> MediaController<St> {
    let grants = GrantTable::new(MEDIA_COMPONENT).grant(EDITOR, "core.admin");
    MediaController::new(base, store, Arc::new(grants))
        .with_events(EventDispatcher::new().with_listener(listener))
}

pub fn token_for(actor: &str) -> String {
    RequestTokens::new(TEST_SECRET).issue(actor)
}

// =============================================================================
// Multipart
// =============================================================================

/// Builds a `multipart/form-data` body by hand.
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Shorthand for a `Filedata[]` part.
    pub fn upload(self, filename: &str, content: &[u8]) -> Self {
        self.file("Filedata[]", filename, content)
    }

    pub fn build(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Upload request carrying a valid token for `actor`.
pub fn upload_request(actor: &str, query: &str, body: Vec<u8>) -> Request<Body> {
    upload_request_with_token(actor, Some(&token_for(actor)), query, body)
}

pub fn upload_request_with_token(
    actor: &str,
    token: Option<&str>,
    query: &str,
    body: Vec<u8>,
) -> Request<Body> {
    let uri = if query.is_empty() {
        "/media/upload".to_string()
    } else {
        format!("/media/upload?{}", query)
    };

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(ACTOR_HEADER, actor)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len());
    if let Some(token) = token {
        builder = builder.header(TOKEN_HEADER, token);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Delete request with a form body, carrying a valid token for `actor`.
pub fn delete_request(actor: &str, paths: &[&str], extra: &[(&str, &str)]) -> Request<Body> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for path in paths {
        serializer.append_pair("rm[]", path);
    }
    for (key, value) in extra {
        serializer.append_pair(key, value);
    }

    Request::builder()
        .method("POST")
        .uri("/media/delete")
        .header(ACTOR_HEADER, actor)
        .header(TOKEN_HEADER, token_for(actor))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(serializer.finish()))
        .unwrap()
}

// =============================================================================
// Responses
// =============================================================================

pub fn location<B>(response: &Response<B>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}

/// Path part of the redirect target.
pub fn location_path<B>(response: &Response<B>) -> String {
    let location = location(response);
    location
        .split_once('?')
        .map(|(path, _)| path.to_string())
        .unwrap_or(location)
}

/// Every query pair of the redirect target, in order.
pub fn query_pairs<B>(response: &Response<B>) -> Vec<(String, String)> {
    let location = location(response);
    let query = location.split_once('?').map(|(_, q)| q).unwrap_or("");
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Status messages carried by the redirect as `(level, text)`.
pub fn messages<B>(response: &Response<B>) -> Vec<(String, String)> {
    query_pairs(response)
        .into_iter()
        .filter(|(k, _)| matches!(k.as_str(), "info" | "warning" | "error"))
        .collect()
}

pub fn query_value<B>(response: &Response<B>, key: &str) -> Option<String> {
    query_pairs(response)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

/// Sorted names of the regular files directly in `dir`.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
