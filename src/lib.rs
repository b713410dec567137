//! # Media Manager
//!
//! Upload and delete files in a media directory over HTTP.
//!
//! Every mutating request passes a request-token check, an authorization gate,
//! path safety checks and a chain of event listeners that may veto the action
//! before it happens and are told about it afterwards.
//!
//! ## Features
//!
//! - **Batch uploads**: all-or-nothing validation, then sequential persistence
//! - **Safe deletes**: files and recursively empty folders only
//! - **Path safety**: filename sanitizing and base-directory containment
//! - **Upload policy**: extension allow-list, executable block-list, markup scan
//! - **Request tokens**: HMAC-SHA256 tokens bound to the acting user
//!
//! ## Architecture
//!
//! - [`path`] - Filename sanitizing and path containment
//! - [`media`] - Collaborators: storage, permissions, events, upload filter
//! - [`controller`] - Upload and delete handlers
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use media_manager::{create_router, GrantTable, LocalMediaStore, MediaController, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let grants = GrantTable::from_specs("media", ["alice=create,delete"]).unwrap();
//!     let controller = MediaController::new("./media", LocalMediaStore::new(), Arc::new(grants));
//!
//!     let router = create_router(controller, RouterConfig::new("secret", "/tmp"));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod media;
pub mod path;
pub mod server;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat};
pub use controller::{
    authorize_action, Action, ActionResult, DeleteReport, DeletionRequest, MediaController,
    StagedFile, TransferError, UploadBatch, UploadItem, UploadLimits, UploadPermit, UploadReport,
};
pub use error::{MediaError, MessageLevel};
pub use media::{
    AllowAll, AuditListener, EventContext, EventDispatcher, EventListener, ExtensionPolicy,
    GrantTable, ListenerOutcome, LocalMediaStore, MediaEvent, MediaStore, PermissionRegistry,
    ProtectedNames, UploadCandidate, UploadFilter, Veto,
};
pub use path::{clean_path, filter_folder, is_safe_relative_path, make_safe, resolve_under};
pub use server::{
    create_router, token_middleware, Actor, AppState, ErrorResponse, HealthResponse,
    MessageRedirect, RequestTokens, RouterConfig, StatusMessage, TokenError,
};
