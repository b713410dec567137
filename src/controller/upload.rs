//! Upload handler.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use super::{authorize::Action, ActionResult, MediaController};
use crate::error::MediaError;
use crate::media::{EventContext, MediaEvent, MediaStore, UploadCandidate};
use crate::path::{filter_folder, make_safe, relative_display, resolve_under};

// =============================================================================
// Request Types
// =============================================================================

/// Problem reported while receiving an uploaded part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferError {
    #[default]
    None,

    /// The part grew past the per-part limit while streaming
    SizeExceeded,

    /// The part could not be received completely
    Other,
}

/// A received file part, staged on disk and not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Name as sent by the client
    pub original_name: String,

    /// Bytes received
    pub size: u64,

    pub transfer_error: TransferError,

    /// Where the bytes were staged
    pub source_temp_path: PathBuf,
}

impl StagedFile {
    pub fn new(original_name: impl Into<String>, source_temp_path: PathBuf, size: u64) -> Self {
        Self {
            original_name: original_name.into(),
            size,
            transfer_error: TransferError::None,
            source_temp_path,
        }
    }

    pub fn with_transfer_error(mut self, transfer_error: TransferError) -> Self {
        self.transfer_error = transfer_error;
        self
    }
}

/// A validated upload ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub original_name: String,

    /// Never empty
    pub sanitized_name: String,

    /// Absolute, cleaned, strictly inside the base directory
    pub target_path: PathBuf,

    pub size: u64,

    pub transfer_error: TransferError,

    pub source_temp_path: PathBuf,
}

/// Files to upload into one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    folder: String,
    files: Vec<StagedFile>,
}

impl UploadBatch {
    /// Validate `folder` and wrap the staged files.
    pub fn new(folder: &str, files: Vec<StagedFile>) -> Result<Self, MediaError> {
        Ok(Self {
            folder: filter_folder(folder)?,
            files,
        })
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }
}

/// Proof that the actor passed the authorization gate and the request size
/// check. Only [`MediaController::preflight_upload`] creates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPermit {
    actor: String,
}

impl UploadPermit {
    pub fn actor(&self) -> &str {
        &self.actor
    }
}

/// Result of processing a batch.
///
/// Items persisted before a failure stay persisted and keep their result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub results: Vec<ActionResult>,

    /// First failure; processing stopped there
    pub failure: Option<MediaError>,
}

impl UploadReport {
    fn failed(failure: MediaError) -> Self {
        Self {
            results: Vec::new(),
            failure: Some(failure),
        }
    }

    /// True only if every item was persisted.
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

// =============================================================================
// Handler
// =============================================================================

impl<St: MediaStore> MediaController<St> {
    /// Authorize `create` and check the declared request size.
    ///
    /// Runs before the request body is read; an unknown content length skips
    /// the size check and leaves it to the per-item checks.
    pub fn preflight_upload(
        &self,
        actor: &str,
        content_length: Option<u64>,
    ) -> Result<UploadPermit, MediaError> {
        self.authorize(actor, Action::Create)?;

        if let Some(length) = content_length {
            if self.limits().exceeded_by(length) {
                let err = MediaError::SizeExceeded;
                warn!(
                    error_type = err.kind(),
                    status = err.status().as_u16(),
                    content_length = length,
                    "Upload request rejected: {}",
                    err
                );
                return Err(err);
            }
        }

        Ok(UploadPermit {
            actor: actor.to_string(),
        })
    }

    /// Validate and persist a batch.
    ///
    /// Every item is validated before anything is written; a single invalid
    /// item rejects the whole batch. Persisting is sequential and stops at the
    /// first failure.
    pub async fn upload(&self, permit: &UploadPermit, batch: UploadBatch) -> UploadReport {
        let UploadBatch { folder, files } = batch;

        let mut items = Vec::with_capacity(files.len());
        let mut targets = HashSet::new();
        for file in files {
            match self.prepare_item(&folder, file, &mut targets).await {
                Ok(item) => items.push(item),
                Err(err) => {
                    warn!(
                        error_type = err.kind(),
                        status = err.status().as_u16(),
                        actor = permit.actor(),
                        "Upload batch rejected: {}",
                        err
                    );
                    return UploadReport::failed(err);
                }
            }
        }

        let mut report = UploadReport::default();
        for item in items {
            match self.persist_item(permit, &item).await {
                Ok(result) => report.results.push(result),
                Err(err) => {
                    report.failure = Some(err);
                    break;
                }
            }
        }

        report
    }

    async fn prepare_item(
        &self,
        folder: &str,
        file: StagedFile,
        targets: &mut HashSet<PathBuf>,
    ) -> Result<UploadItem, MediaError> {
        match file.transfer_error {
            TransferError::None => {}
            TransferError::SizeExceeded => return Err(MediaError::SizeExceeded),
            TransferError::Other => {
                return Err(MediaError::Io(format!(
                    "Upload of \"{}\" was interrupted.",
                    file.original_name
                )))
            }
        }

        let maxsize = self.limits().upload_maxsize;
        if maxsize != 0 && file.size > maxsize {
            return Err(MediaError::SizeExceeded);
        }

        let sanitized_name = make_safe(&file.original_name);
        if sanitized_name.is_empty() {
            return Err(MediaError::NameUnsafe);
        }

        let target_path = resolve_under(self.base_dir(), folder, &sanitized_name)?;

        if self.store().exists(&target_path).await || !targets.insert(target_path.clone()) {
            return Err(MediaError::DestinationExists);
        }

        debug!(
            original = %file.original_name,
            sanitized = %sanitized_name,
            target = %target_path.display(),
            "upload item validated"
        );

        Ok(UploadItem {
            original_name: file.original_name,
            sanitized_name,
            target_path,
            size: file.size,
            transfer_error: file.transfer_error,
            source_temp_path: file.source_temp_path,
        })
    }

    async fn persist_item(
        &self,
        permit: &UploadPermit,
        item: &UploadItem,
    ) -> Result<ActionResult, MediaError> {
        let relative = relative_display(self.base_dir(), &item.target_path);

        let candidate = UploadCandidate {
            name: item.sanitized_name.clone(),
            size: item.size,
            source: item.source_temp_path.clone(),
        };
        if let Err(reason) = self.filter.can_upload(&candidate).await {
            let err = MediaError::CapabilityDenied { reason };
            warn!(
                error_type = err.kind(),
                status = err.status().as_u16(),
                path = %relative,
                "Upload refused: {}",
                err
            );
            return Err(err);
        }

        let event = MediaEvent {
            actor: permit.actor().to_string(),
            path: item.target_path.clone(),
            relative_path: relative.clone(),
            size: Some(item.size),
        };

        self.events().before_save(EventContext::File, &event)?;

        if let Err(err) = self
            .store()
            .move_file(&item.source_temp_path, &item.target_path)
            .await
        {
            error!(
                path = %relative,
                status = 500u16,
                "Unable to persist upload: {}",
                err
            );
            return Err(MediaError::Io(format!("Unable to upload file \"{}\".", relative)));
        }

        self.events().after_save(EventContext::File, &event);
        info!(actor = permit.actor(), path = %relative, size = item.size, "upload complete");

        Ok(ActionResult::succeeded(
            format!("Upload of \"{}\" complete.", relative),
            relative,
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
