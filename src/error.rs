use http::StatusCode;
use thiserror::Error;

/// Severity attached to a message shown to the actor after a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

impl MessageLevel {
    /// Query parameter name used to carry messages of this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageLevel::Info => "info",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
        }
    }
}

/// Errors produced while handling media upload and delete requests.
///
/// Everything except `TokenInvalid` is recovered at the handler boundary and
/// turned into a redirect message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// Request token missing or wrong; the request is terminated
    #[error("The most recent request was denied because it contained an invalid security token.")]
    TokenInvalid,

    /// The actor lacks `core.<action>` on the media component
    #[error("{} not permitted.", capitalize(.action))]
    Unauthorized { action: String },

    /// Request or item exceeds one of the configured size limits
    #[error("This file is too large to upload.")]
    SizeExceeded,

    /// Filename is empty after sanitization
    #[error("Invalid request: the file name is empty or unsafe.")]
    NameUnsafe,

    /// A file already exists at the upload target
    #[error("File already exists.")]
    DestinationExists,

    /// The upload filter refused the item
    #[error("{reason}")]
    CapabilityDenied { reason: String },

    /// One or more event listeners vetoed the action
    #[error("{} error(s) reported by listeners: {}", .errors.len(), .errors.join("; "))]
    CollaboratorVeto { errors: Vec<String> },

    /// Filesystem failure while moving or deleting
    #[error("I/O error: {0}")]
    Io(String),

    /// Directory still holds real content
    #[error("Unable to delete \"{path}\": folder is not empty.")]
    FolderNotEmpty { path: String },

    /// Path failed the safety predicate or escapes the base directory
    #[error("Unable to process \"{path}\": names may only contain letters, digits, '.', '_', '-' and spaces.")]
    PathUnsafe { path: String },
}

impl MediaError {
    /// Level the message is shown at.
    ///
    /// A missing filename and a bad token are errors; everything else is a
    /// warning.
    pub fn level(&self) -> MessageLevel {
        match self {
            MediaError::NameUnsafe | MediaError::TokenInvalid => MessageLevel::Error,
            _ => MessageLevel::Warning,
        }
    }

    /// Status code used when logging the failure.
    pub fn status(&self) -> StatusCode {
        match self {
            MediaError::TokenInvalid | MediaError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            MediaError::SizeExceeded => StatusCode::PAYLOAD_TOO_LARGE,
            MediaError::DestinationExists | MediaError::FolderNotEmpty { .. } => {
                StatusCode::CONFLICT
            }
            MediaError::CapabilityDenied { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            MediaError::CollaboratorVeto { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            MediaError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MediaError::NameUnsafe | MediaError::PathUnsafe { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Short machine-readable identifier for logs and JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            MediaError::TokenInvalid => "token_invalid",
            MediaError::Unauthorized { .. } => "unauthorized",
            MediaError::SizeExceeded => "size_exceeded",
            MediaError::NameUnsafe => "name_unsafe",
            MediaError::DestinationExists => "destination_exists",
            MediaError::CapabilityDenied { .. } => "capability_denied",
            MediaError::CollaboratorVeto { .. } => "collaborator_veto",
            MediaError::Io(_) => "io_error",
            MediaError::FolderNotEmpty { .. } => "folder_not_empty",
            MediaError::PathUnsafe { .. } => "path_unsafe",
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Io(err.to_string())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
