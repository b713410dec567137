//! Redirect responses carrying status messages.
//!
//! Mutating endpoints answer with `303 See Other`. Messages for the actor are
//! appended to the target as `info=`, `warning=` and `error=` query pairs in
//! the order they were produced.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose, Engine as _};
use tracing::debug;
use url::form_urlencoded;

use crate::error::{MediaError, MessageLevel};

// =============================================================================
// Status Messages
// =============================================================================

/// One message shown to the actor after the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            text: text.into(),
        }
    }
}

impl From<&MediaError> for StatusMessage {
    fn from(err: &MediaError) -> Self {
        Self {
            level: err.level(),
            text: err.to_string(),
        }
    }
}

// =============================================================================
// Targets
// =============================================================================

/// Decode a base64 return URL, accepting it only if it is a local path.
///
/// Absolute URLs, protocol-relative URLs and anything that is not valid UTF-8
/// are refused so the redirect cannot leave the site.
pub fn decode_return_url(encoded: &str) -> Option<String> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return None;
    }

    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .or_else(|_| general_purpose::URL_SAFE.decode(encoded))
        .ok()?;
    let url = String::from_utf8(bytes).ok()?;

    if is_local_path(&url) {
        Some(url)
    } else {
        debug!(return_url = %url, "ignoring non-local return url");
        None
    }
}

fn is_local_path(url: &str) -> bool {
    url.starts_with('/')
        && !url.starts_with("//")
        && !url.contains('\\')
        && !url.chars().any(char::is_control)
}

/// Append `key=value` pairs to `target`, starting a query string if needed.
pub fn append_query(target: &str, pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return target.to_string();
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    let query = serializer.finish();

    let separator = if !target.contains('?') {
        "?"
    } else if target.ends_with('?') || target.ends_with('&') {
        ""
    } else {
        "&"
    };
    format!("{}{}{}", target, separator, query)
}

/// Where an upload redirects: the decoded return URL, else `base?folder=`.
pub fn upload_target(base: &str, return_url: Option<&str>, folder: &str) -> String {
    let target = return_url
        .and_then(decode_return_url)
        .unwrap_or_else(|| base.to_string());
    append_query(&target, &[("folder", folder)])
}

/// Where a delete redirects; `component` keeps the embedded list view.
pub fn delete_target(base: &str, folder: &str, component: bool) -> String {
    let mut pairs = vec![("folder", folder)];
    if component {
        pairs.push(("view", "mediaList"));
        pairs.push(("tmpl", "component"));
    }
    append_query(base, &pairs)
}

// =============================================================================
// Response
// =============================================================================

/// A `303 See Other` redirect with status messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRedirect {
    pub target: String,
    pub messages: Vec<StatusMessage>,
}

impl MessageRedirect {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: StatusMessage) {
        self.messages.push(message);
    }

    pub fn with_message(mut self, message: StatusMessage) -> Self {
        self.push(message);
        self
    }

    /// Final location including the message pairs.
    pub fn location(&self) -> String {
        let pairs: Vec<(&str, &str)> = self
            .messages
            .iter()
            .map(|m| (m.level.as_str(), m.text.as_str()))
            .collect();
        append_query(&self.target, &pairs)
    }
}

impl IntoResponse for MessageRedirect {
    fn into_response(self) -> Response {
        let location = self.location();
        match header::HeaderValue::from_str(&location) {
            Ok(value) => (StatusCode::SEE_OTHER, [(header::LOCATION, value)]).into_response(),
            // Only reachable with a non-ASCII return URL
            Err(_) => (
                StatusCode::SEE_OTHER,
                [(header::LOCATION, header::HeaderValue::from_static("/"))],
            )
                .into_response(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
