//! Upload and delete handlers, independent of the HTTP layer.
//!
//! [`MediaController`] owns the base directory and the injected collaborators.
//! The HTTP handlers in [`crate::server`] only translate requests into
//! [`UploadBatch`] / [`DeletionRequest`] values and reports into redirects.
//!
//! # Upload flow
//!
//! ```text
//! preflight_upload(actor, content_length)     authorize + request size
//!        │
//!        ▼  UploadPermit
//! upload(permit, batch)
//!   1. validate every item (all-or-nothing)   transfer error, size, name,
//!                                             containment, existing target
//!   2. for each item (fail-fast)              filter → before_save → move
//!                                             → after_save
//! ```

pub mod authorize;
mod delete;
mod upload;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::MediaError;
use crate::media::{EventDispatcher, ExtensionPolicy, MediaStore, PermissionRegistry, UploadFilter};

pub use authorize::{authorize_action, Action};
pub use delete::{DeleteReport, DeletionRequest, IGNORED_FOLDER_ENTRIES};
pub use upload::{StagedFile, TransferError, UploadBatch, UploadItem, UploadPermit, UploadReport};

/// Bytes per megabyte as used by the size limits.
pub const MEGABYTE: u64 = 1024 * 1024;

// =============================================================================
// Shared Types
// =============================================================================

/// Outcome of one upload or deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub success: bool,

    /// Message shown to the actor
    pub message: String,

    /// Path relative to the base directory, with a leading `/`
    pub affected_path: String,
}

impl ActionResult {
    pub fn succeeded(message: impl Into<String>, affected_path: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            affected_path: affected_path.into(),
        }
    }

    pub fn failed(message: impl Into<String>, affected_path: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            affected_path: affected_path.into(),
        }
    }
}

/// Request size limits, all in bytes.
///
/// Zero means unlimited for every limit except `memory_limit`, where `None`
/// is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadLimits {
    /// Configured maximum upload size
    pub upload_maxsize: u64,

    /// Server limit on a single uploaded part
    pub server_upload_max: u64,

    /// Server limit on a whole request body
    pub post_max: u64,

    /// Server memory limit
    pub memory_limit: Option<u64>,
}

impl UploadLimits {
    /// Build limits from megabyte values; a negative memory limit is unlimited.
    pub fn from_megabytes(
        upload_maxsize: u64,
        server_upload_max: u64,
        post_max: u64,
        memory_limit: i64,
    ) -> Self {
        Self {
            upload_maxsize: upload_maxsize.saturating_mul(MEGABYTE),
            server_upload_max: server_upload_max.saturating_mul(MEGABYTE),
            post_max: post_max.saturating_mul(MEGABYTE),
            memory_limit: u64::try_from(memory_limit)
                .ok()
                .map(|mb| mb.saturating_mul(MEGABYTE)),
        }
    }

    /// True if a request of `content_length` bytes exceeds any limit.
    pub fn exceeded_by(&self, content_length: u64) -> bool {
        let over = |limit: u64| limit != 0 && content_length > limit;

        over(self.upload_maxsize)
            || over(self.server_upload_max)
            || over(self.post_max)
            || self.memory_limit.is_some_and(|limit| content_length > limit)
    }

    /// Largest size a single uploaded part may reach while streaming.
    pub fn part_limit(&self) -> Option<u64> {
        [self.upload_maxsize, self.server_upload_max]
            .into_iter()
            .filter(|l| *l != 0)
            .min()
    }
}

// =============================================================================
// MediaController
// =============================================================================

/// Upload and delete operations over a base directory.
pub struct MediaController<St: MediaStore> {
    base_dir: PathBuf,
    store: St,
    permissions: Arc<dyn PermissionRegistry>,
    events: EventDispatcher,
    filter: Arc<dyn UploadFilter>,
    limits: UploadLimits,
}

impl<St: MediaStore> MediaController<St> {
    /// Create a controller with no listeners, the default extension policy and
    /// no size limits.
    pub fn new(
        base_dir: impl Into<PathBuf>,
        store: St,
        permissions: Arc<dyn PermissionRegistry>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            store,
            permissions,
            events: EventDispatcher::new(),
            filter: Arc::new(ExtensionPolicy::default()),
            limits: UploadLimits::default(),
        }
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn UploadFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Run the authorization gate for `actor`.
    pub fn authorize(&self, actor: &str, action: Action) -> Result<(), MediaError> {
        authorize_action(self.permissions.as_ref(), actor, action)
    }
}

// =============================================================================
// Tests
// =============================================================================
