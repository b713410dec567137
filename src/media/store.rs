//! Filesystem access for the media directory.
//!
//! Handlers only touch the disk through [`MediaStore`], which keeps them
//! testable against temporary directories and lets deployments swap in other
//! backends.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::MediaError;

// =============================================================================
// MediaStore Trait
// =============================================================================

/// Filesystem operations needed by the upload and delete handlers.
///
/// All paths are absolute and have already been checked against the base
/// directory by the caller.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// True if any entry (file, directory or symlink) exists at `path`.
    ///
    /// Stricter than a plain file check: an upload onto an existing directory
    /// or dangling symlink counts as a conflict too.
    async fn exists(&self, path: &Path) -> bool;

    /// True if `path` is a regular file.
    async fn is_file(&self, path: &Path) -> bool;

    /// True if `path` is a directory.
    async fn is_dir(&self, path: &Path) -> bool;

    /// Move a staged upload to its destination, creating parent directories.
    async fn move_file(&self, src: &Path, dst: &Path) -> Result<(), MediaError>;

    /// Remove a single file.
    async fn delete_file(&self, path: &Path) -> Result<(), MediaError>;

    /// Remove a directory and everything below it.
    async fn delete_dir_recursive(&self, path: &Path) -> Result<(), MediaError>;

    /// List every non-directory entry below `path`.
    ///
    /// Entries whose name is in `exclude`, starts with `.` or ends with `~` are
    /// skipped, and excluded directories are not descended into.
    async fn list_files_recursive(
        &self,
        path: &Path,
        exclude: &[&str],
    ) -> Result<Vec<PathBuf>, MediaError>;
}

// =============================================================================
// Local Filesystem Store
// =============================================================================

/// [`MediaStore`] backed by the local filesystem via `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalMediaStore {
    /// Permission bits applied to moved files (unix only)
    file_mode: Option<u32>,
}

impl LocalMediaStore {
    /// Create a store that leaves file permissions untouched.
    pub fn new() -> Self {
        Self { file_mode: None }
    }

    /// Apply `mode` to every file moved into the media directory.
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = Some(mode);
        self
    }

    #[cfg(unix)]
    async fn apply_mode(&self, path: &Path) -> Result<(), MediaError> {
        use std::os::unix::fs::PermissionsExt;

        if let Some(mode) = self.file_mode {
            fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    async fn apply_mode(&self, _path: &Path) -> Result<(), MediaError> {
        Ok(())
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).await.is_ok()
    }

    async fn is_file(&self, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn move_file(&self, src: &Path, dst: &Path) -> Result<(), MediaError> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(rename_err) = fs::rename(src, dst).await {
            // Staging and media directories may live on different devices
            debug!(
                src = %src.display(),
                dst = %dst.display(),
                "rename failed ({}), falling back to copy",
                rename_err
            );
            fs::copy(src, dst).await?;
            fs::remove_file(src).await?;
        }

        self.apply_mode(dst).await
    }

    async fn delete_file(&self, path: &Path) -> Result<(), MediaError> {
        fs::remove_file(path).await?;
        Ok(())
    }

    async fn delete_dir_recursive(&self, path: &Path) -> Result<(), MediaError> {
        fs::remove_dir_all(path).await?;
        Ok(())
    }

    async fn list_files_recursive(
        &self,
        path: &Path,
        exclude: &[&str],
    ) -> Result<Vec<PathBuf>, MediaError> {
        let root = path.to_path_buf();
        let exclude: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();

        tokio::task::spawn_blocking(move || collect_files(&root, &exclude))
            .await
            .map_err(|e| MediaError::Io(format!("directory listing task failed: {}", e)))?
    }
}

fn collect_files(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>, MediaError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !is_ignored(&entry.file_name().to_string_lossy(), exclude));

    for entry in walker {
        let entry = entry.map_err(|e| MediaError::Io(e.to_string()))?;
        if !entry.file_type().is_dir() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn is_ignored(name: &str, exclude: &[String]) -> bool {
    name.starts_with('.') || name.ends_with('~') || exclude.iter().any(|e| e == name)
}

// =============================================================================
// Tests
// =============================================================================
