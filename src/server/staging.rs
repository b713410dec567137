//! Multipart staging for upload requests.
//!
//! File parts are streamed into temporary files under the staging directory.
//! The temporary files are removed when [`StagedUpload`] is dropped, so parts
//! that were never moved into the media directory do not linger.

use std::path::Path;

use axum::extract::multipart::{Field, Multipart};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::controller::{StagedFile, TransferError};
use crate::error::MediaError;

/// Multipart field names carrying files.
pub const FILE_FIELDS: &[&str] = &["Filedata[]", "Filedata"];

/// Multipart field carrying the target folder.
pub const FOLDER_FIELD: &str = "folder";

/// Multipart field carrying the base64 return URL.
pub const RETURN_URL_FIELD: &str = "return-url";

/// Everything read from an upload request body.
#[derive(Debug, Default)]
pub struct StagedUpload {
    pub files: Vec<StagedFile>,
    pub folder: Option<String>,
    pub return_url: Option<String>,
    temp_paths: Vec<TempPath>,
}

/// Read every field of `multipart`, staging file parts under `staging_dir`.
///
/// A part growing past `part_limit` stops being written and is marked
/// [`TransferError::SizeExceeded`]; a part whose body breaks off is marked
/// [`TransferError::Other`]. A body that cannot be parsed at all fails the
/// request.
pub async fn stage_multipart(
    mut multipart: Multipart,
    staging_dir: &Path,
    part_limit: Option<u64>,
) -> Result<StagedUpload, MediaError> {
    let mut staged = StagedUpload::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "Malformed upload request");
                return Err(MediaError::Io(format!("Malformed upload request: {}", err)));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        if FILE_FIELDS.contains(&name.as_str()) {
            let original_name = field.file_name().unwrap_or_default().to_string();
            let (file, temp_path) = stage_file(field, original_name, staging_dir, part_limit).await?;
            staged.files.push(file);
            staged.temp_paths.push(temp_path);
        } else if name == FOLDER_FIELD {
            staged.folder = Some(read_text(field).await?);
        } else if name == RETURN_URL_FIELD {
            staged.return_url = Some(read_text(field).await?);
        } else {
            debug!(field = %name, "ignoring multipart field");
        }
    }

    Ok(staged)
}

async fn stage_file(
    mut field: Field<'_>,
    original_name: String,
    staging_dir: &Path,
    part_limit: Option<u64>,
) -> Result<(StagedFile, TempPath), MediaError> {
    let temp = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(staging_dir)?;
    let (file, temp_path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut size: u64 = 0;
    let mut transfer_error = TransferError::None;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                size += chunk.len() as u64;
                if part_limit.is_some_and(|limit| size > limit) {
                    transfer_error = TransferError::SizeExceeded;
                    break;
                }
                file.write_all(&chunk).await?;
            }
            Ok(None) => break,
            Err(err) => {
                warn!(file = %original_name, error = %err, "Upload part interrupted");
                transfer_error = TransferError::Other;
                break;
            }
        }
    }
    file.flush().await?;

    debug!(
        file = %original_name,
        size = size,
        staged = %temp_path.display(),
        "staged upload part"
    );

    let path = temp_path.to_path_buf();
    Ok((
        StagedFile::new(original_name, path, size).with_transfer_error(transfer_error),
        temp_path,
    ))
}

async fn read_text(field: Field<'_>) -> Result<String, MediaError> {
    field
        .text()
        .await
        .map_err(|err| MediaError::Io(format!("Malformed upload request: {}", err)))
}
