//! HTTP request handlers for the media endpoints.
//!
//! # Endpoints
//!
//! - `POST /media/upload` - Upload one or more files into a folder
//! - `POST /media/delete` - Delete files or empty folders
//! - `GET /health` - Health check endpoint
//!
//! Both media endpoints answer with a `303 See Other` redirect carrying status
//! messages; only a failed token check produces a JSON error body.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, Query, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::form_urlencoded;

use super::auth::Actor;
use super::redirect::{delete_target, upload_target, MessageRedirect, StatusMessage};
use super::staging::stage_multipart;
use crate::controller::{DeletionRequest, MediaController, UploadBatch};
use crate::error::MediaError;
use crate::media::MediaStore;

/// Redirect base used when none is configured.
pub const DEFAULT_REDIRECT_BASE: &str = "/media";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the media controller.
pub struct AppState<St: MediaStore> {
    pub controller: Arc<MediaController<St>>,

    /// Directory where multipart file parts are staged
    pub staging_dir: Arc<PathBuf>,

    /// Path redirects point at when no return URL is given
    pub redirect_base: Arc<str>,
}

impl<St: MediaStore> AppState<St> {
    pub fn new(controller: MediaController<St>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            controller: Arc::new(controller),
            staging_dir: Arc::new(staging_dir.into()),
            redirect_base: Arc::from(DEFAULT_REDIRECT_BASE),
        }
    }

    pub fn with_redirect_base(mut self, base: impl AsRef<str>) -> Self {
        self.redirect_base = Arc::from(base.as_ref());
        self
    }
}

impl<St: MediaStore> Clone for AppState<St> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            staging_dir: Arc::clone(&self.staging_dir),
            redirect_base: Arc::clone(&self.redirect_base),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters accepted by the upload endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct UploadQueryParams {
    #[serde(default)]
    pub folder: Option<String>,

    /// Base64-encoded local path to return to
    #[serde(default, rename = "return-url")]
    pub return_url: Option<String>,
}

/// Parameters of a delete request, merged from the body and the query string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteParams {
    /// Values of the repeated `rm[]` parameter
    pub paths: Vec<String>,
    pub folder: Option<String>,
    pub tmpl: Option<String>,
}

impl DeleteParams {
    /// Parse `application/x-www-form-urlencoded` pairs.
    pub fn parse(input: &[u8]) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(input) {
            match key.as_ref() {
                "rm[]" | "rm" => params.paths.push(value.into_owned()),
                "folder" => params.folder = Some(value.into_owned()),
                "tmpl" => params.tmpl = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// Combine body and query parameters; body values win.
    pub fn merge(body: Self, query: Self) -> Self {
        Self {
            paths: if body.paths.is_empty() {
                query.paths
            } else {
                body.paths
            },
            folder: body.folder.or(query.folder),
            tmpl: body.tmpl.or(query.tmpl),
        }
    }

    /// True when the request comes from the embedded list view.
    pub fn is_component(&self) -> bool {
        self.tmpl.as_deref() == Some("component")
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned when a request is terminated.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "token_invalid")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,

    /// Names of the registered event listeners
    pub listeners: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle upload requests.
///
/// # Endpoint
///
/// `POST /media/upload` (multipart)
///
/// # Fields
///
/// - `Filedata[]` / `Filedata`: file parts
/// - `folder`: target folder relative to the media root (also read from the query)
/// - `return-url`: base64 local path to redirect to (also read from the query)
///
/// # Response
///
/// `303 See Other` to the return URL (or `{base}?folder=`) with one `info=`
/// pair per stored file and a `warning=`/`error=` pair for a failure. An empty
/// sanitized filename redirects to `{base}` itself.
pub async fn upload_handler<St: MediaStore + 'static>(
    State(state): State<AppState<St>>,
    actor: Actor,
    Query(query): Query<UploadQueryParams>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let controller = &state.controller;
    let base = state.redirect_base.as_ref();

    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    // The body is still unread here, so only query parameters are known.
    let permit = match controller.preflight_upload(actor.id(), content_length) {
        Ok(permit) => permit,
        Err(err) => {
            let folder = query.folder.as_deref().unwrap_or_default();
            let target = upload_target(base, query.return_url.as_deref(), folder);
            return MessageRedirect::new(target)
                .with_message(StatusMessage::from(&err))
                .into_response();
        }
    };

    let staged = match stage_multipart(
        multipart,
        &state.staging_dir,
        controller.limits().part_limit(),
    )
    .await
    {
        Ok(staged) => staged,
        Err(err) => {
            let target = upload_target(base, query.return_url.as_deref(), "");
            return MessageRedirect::new(target)
                .with_message(StatusMessage::from(&err))
                .into_response();
        }
    };

    let raw_folder = staged
        .folder
        .clone()
        .or(query.folder)
        .unwrap_or_default();
    let return_url = staged.return_url.clone().or(query.return_url);

    let batch = match UploadBatch::new(&raw_folder, staged.files.clone()) {
        Ok(batch) => batch,
        Err(err) => {
            let target = upload_target(base, return_url.as_deref(), "");
            return MessageRedirect::new(target)
                .with_message(StatusMessage::from(&err))
                .into_response();
        }
    };

    let folder = batch.folder().to_string();
    debug!(
        actor = actor.id(),
        folder = %folder,
        files = batch.files().len(),
        "upload request"
    );

    let report = controller.upload(&permit, batch).await;

    let target = match report.failure {
        Some(MediaError::NameUnsafe) => base.to_string(),
        _ => upload_target(base, return_url.as_deref(), &folder),
    };
    let mut redirect = MessageRedirect::new(target);
    for result in &report.results {
        redirect.push(StatusMessage::info(result.message.clone()));
    }
    if let Some(err) = &report.failure {
        redirect.push(StatusMessage::from(err));
    }

    // Unpersisted staged parts are removed here
    drop(staged);

    redirect.into_response()
}

/// Handle delete requests.
///
/// # Endpoint
///
/// `POST /media/delete` (form body and/or query string)
///
/// # Parameters
///
/// - `rm[]`: repeated, names relative to `folder`
/// - `folder`: folder relative to the media root
/// - `tmpl`: `component` when called from the embedded list view
///
/// # Response
///
/// `303 See Other` to `{base}?folder=` (plus `&view=mediaList&tmpl=component`
/// for the embedded view) with one message per deleted or skipped entry.
pub async fn delete_handler<St: MediaStore + 'static>(
    State(state): State<AppState<St>>,
    actor: Actor,
    RawQuery(raw_query): RawQuery,
    body: Bytes,
) -> Response {
    let base = state.redirect_base.as_ref();
    let params = DeleteParams::merge(
        DeleteParams::parse(&body),
        DeleteParams::parse(raw_query.unwrap_or_default().as_bytes()),
    );
    let component = params.is_component();

    let request = match DeletionRequest::new(
        params.folder.as_deref().unwrap_or_default(),
        params.paths,
    ) {
        Ok(request) => request,
        Err(err) => {
            return MessageRedirect::new(delete_target(base, "", component))
                .with_message(StatusMessage::from(&err))
                .into_response();
        }
    };

    let mut redirect = MessageRedirect::new(delete_target(base, request.base_folder(), component));
    debug!(
        actor = actor.id(),
        folder = request.base_folder(),
        paths = request.relative_paths().len(),
        "delete request"
    );

    match state.controller.delete(actor.id(), request).await {
        Ok(report) => {
            for warning in &report.warnings {
                redirect.push(StatusMessage::from(warning));
            }
            for result in &report.results {
                if result.success {
                    redirect.push(StatusMessage::info(result.message.clone()));
                } else {
                    redirect.push(StatusMessage::warning(result.message.clone()));
                }
            }
        }
        Err(err) => redirect.push(StatusMessage::from(&err)),
    }

    redirect.into_response()
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "listeners": ["audit"]
/// }
/// ```
pub async fn health_handler<St: MediaStore + 'static>(
    State(state): State<AppState<St>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        listeners: state.controller.events().listener_names(),
    })
}

// =============================================================================
// Tests
// =============================================================================
