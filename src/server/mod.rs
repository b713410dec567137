//! HTTP server layer for the media manager.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │         POST /media/upload        POST /media/delete            │
//! │                                                                 │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────┐  │
//! │  │ handlers │ │   auth   │ │ staging  │ │ redirect │ │routes │  │
//! │  │          │ │ (tokens) │ │(multipart│ │(messages)│ │       │  │
//! │  └──────────┘ └──────────┘ └──────────┘ └──────────┘ └───────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                        MediaController
//! ```

pub mod auth;
pub mod handlers;
pub mod redirect;
pub mod routes;
pub mod staging;

pub use auth::{token_middleware, Actor, RequestTokens, TokenError, ACTOR_HEADER, TOKEN_HEADER};
pub use handlers::{
    delete_handler, health_handler, upload_handler, AppState, DeleteParams, ErrorResponse,
    HealthResponse, UploadQueryParams,
};
pub use redirect::{MessageRedirect, StatusMessage};
pub use routes::{create_router, RouterConfig, DELETE_BODY_LIMIT};
pub use staging::{stage_multipart, StagedUpload};
