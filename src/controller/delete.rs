//! Delete handler.

use tracing::{debug, error, info, warn};

use super::{authorize::Action, ActionResult, MediaController};
use crate::error::MediaError;
use crate::media::{EventContext, MediaEvent, MediaStore};
use crate::path::{filter_folder, is_safe_relative_path, relative_display, resolve_under};

/// Entries that do not count as content when deciding whether a folder is
/// empty. Dot-files and `~` backups are ignored as well.
pub const IGNORED_FOLDER_ENTRIES: &[&str] = &[".svn", "CVS", ".DS_Store", "__MACOSX", "index.html"];

/// Paths to delete from one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    relative_paths: Vec<String>,
    base_folder: String,
}

impl DeletionRequest {
    /// Validate `folder`; the individual paths are checked during deletion.
    ///
    /// A request without paths never fails: an unsafe folder is replaced by
    /// the base directory.
    pub fn new(folder: &str, relative_paths: Vec<String>) -> Result<Self, MediaError> {
        let base_folder = if relative_paths.is_empty() {
            filter_folder(folder).unwrap_or_default()
        } else {
            filter_folder(folder)?
        };

        Ok(Self {
            relative_paths,
            base_folder,
        })
    }

    pub fn relative_paths(&self) -> &[String] {
        &self.relative_paths
    }

    pub fn base_folder(&self) -> &str {
        &self.base_folder
    }

    pub fn is_empty(&self) -> bool {
        self.relative_paths.is_empty()
    }
}

/// Result of a deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// Logical AND of every delete call actually made
    pub success: bool,

    /// One entry per delete call
    pub results: Vec<ActionResult>,

    /// Items skipped because they were unsafe, vetoed or non-empty folders
    pub warnings: Vec<MediaError>,
}

impl Default for DeleteReport {
    fn default() -> Self {
        Self {
            success: true,
            results: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<St: MediaStore> MediaController<St> {
    /// Delete files and empty folders.
    ///
    /// An empty request succeeds without authorizing or notifying anyone.
    /// Otherwise `delete` is authorized once for the whole request; a denial
    /// is the only error returned; per-item problems become warnings.
    pub async fn delete(
        &self,
        actor: &str,
        request: DeletionRequest,
    ) -> Result<DeleteReport, MediaError> {
        let mut report = DeleteReport::default();
        if request.is_empty() {
            return Ok(report);
        }

        self.authorize(actor, Action::Delete)?;

        for path in request.relative_paths() {
            if !is_safe_relative_path(path) {
                let err = MediaError::PathUnsafe { path: path.clone() };
                warn!(error_type = err.kind(), actor = actor, "Delete skipped: {}", err);
                report.warnings.push(err);
                continue;
            }

            let full_path = match resolve_under(self.base_dir(), request.base_folder(), path) {
                Ok(full_path) => full_path,
                Err(err) => {
                    report.warnings.push(err);
                    continue;
                }
            };
            let relative = relative_display(self.base_dir(), &full_path);
            let event = MediaEvent {
                actor: actor.to_string(),
                path: full_path.clone(),
                relative_path: relative.clone(),
                size: None,
            };

            let context = if self.store().is_file(&full_path).await {
                EventContext::File
            } else if self.store().is_dir(&full_path).await {
                match self
                    .store()
                    .list_files_recursive(&full_path, IGNORED_FOLDER_ENTRIES)
                    .await
                {
                    Ok(contents) if contents.is_empty() => EventContext::Folder,
                    Ok(contents) => {
                        let err = MediaError::FolderNotEmpty { path: relative };
                        warn!(
                            error_type = err.kind(),
                            entries = contents.len(),
                            "Delete skipped: {}",
                            err
                        );
                        report.warnings.push(err);
                        continue;
                    }
                    Err(err) => {
                        warn!(error_type = err.kind(), path = %relative, "Delete skipped: {}", err);
                        report.warnings.push(err);
                        continue;
                    }
                }
            } else {
                debug!(path = %relative, "nothing to delete");
                continue;
            };

            if let Err(veto) = self.events().before_delete(context, &event) {
                let err: MediaError = veto.into();
                warn!(error_type = err.kind(), path = %relative, "Delete vetoed: {}", err);
                report.warnings.push(err);
                continue;
            }

            let outcome = match context {
                EventContext::File => self.store().delete_file(&full_path).await,
                EventContext::Folder => self.store().delete_dir_recursive(&full_path).await,
            };
            report.success = report.success && outcome.is_ok();

            match outcome {
                Ok(()) => {
                    self.events().after_delete(context, &event);
                    info!(actor = actor, context = %context, path = %relative, "delete complete");
                    report.results.push(ActionResult::succeeded(
                        format!("Delete of \"{}\" complete.", relative),
                        relative,
                    ));
                }
                Err(err) => {
                    error!(path = %relative, status = 500u16, "Unable to delete: {}", err);
                    report.results.push(ActionResult::failed(
                        format!("Unable to delete \"{}\".", relative),
                        relative,
                    ));
                }
            }
        }

        Ok(report)
    }
}
