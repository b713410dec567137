//! Upload capability filter.
//!
//! [`ExtensionPolicy`] decides whether a staged file may be persisted based on
//! its name, size and leading bytes.

use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;

use async_trait::async_trait;

// =============================================================================
// Constants
// =============================================================================

/// Extensions accepted when no allow-list is configured.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "bmp", "csv", "doc", "gif", "ico", "jpg", "jpeg", "odg", "odp", "ods", "odt", "pdf", "png",
    "ppt", "swf", "txt", "xcf", "xls", "docx", "xlsx", "pptx", "webp", "svg", "mp3", "mp4",
];

/// Extensions skipped by the content scan.
pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[];

/// Segments that make a name executable wherever they appear in it.
pub const EXECUTABLE_EXTENSIONS: &[&str] = &[
    "php", "js", "exe", "phtml", "java", "perl", "py", "asp", "dll", "go", "ade", "adp", "bat",
    "chm", "cmd", "com", "cpl", "hta", "ins", "isp", "jse", "lib", "mde", "msc", "msp", "mst",
    "pif", "scr", "sct", "shb", "sys", "vb", "vbe", "vbs", "vxd", "wsc", "wsf", "wsh",
];

/// Tags that must not appear in the first bytes of an upload.
const XSS_TAGS: &[&str] = &[
    "abbr", "acronym", "address", "applet", "area", "audioscope", "base", "basefont", "bdo",
    "bgsound", "big", "blackface", "blink", "blockquote", "body", "bq", "br", "button",
    "caption", "center", "cite", "code", "col", "colgroup", "comment", "custom", "dd", "del",
    "dfn", "dir", "div", "dl", "dt", "em", "embed", "fieldset", "fn", "font", "form", "frame",
    "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hr", "html", "iframe", "ilayer",
    "img", "input", "ins", "isindex", "keygen", "kbd", "label", "layer", "legend", "li",
    "limittext", "link", "listing", "map", "marquee", "menu", "meta", "multicol", "nobr",
    "noembed", "noframes", "noscript", "nosmartquotes", "object", "ol", "optgroup", "option",
    "param", "plaintext", "pre", "rt", "ruby", "s", "samp", "script", "select", "server",
    "shadow", "sidebar", "small", "spacer", "span", "strike", "strong", "style", "sub", "sup",
    "table", "tbody", "td", "textarea", "tfoot", "th", "thead", "title", "tr", "tt", "ul", "var",
    "wbr", "xml", "xmp", "!doctype", "!--",
];

/// Number of leading bytes inspected for markup.
const SCAN_BYTES: usize = 256;

// =============================================================================
// UploadFilter Trait
// =============================================================================

/// What the filter gets to see of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    /// Sanitized file name
    pub name: String,

    /// Size in bytes
    pub size: u64,

    /// Staged file on disk
    pub source: PathBuf,
}

/// Decides whether an upload may be persisted.
#[async_trait]
pub trait UploadFilter: Send + Sync {
    /// `Err(reason)` rejects the upload with a message shown to the actor.
    async fn can_upload(&self, candidate: &UploadCandidate) -> Result<(), String>;
}

/// Filter that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl UploadFilter for AllowAll {
    async fn can_upload(&self, _candidate: &UploadCandidate) -> Result<(), String> {
        Ok(())
    }
}

// =============================================================================
// Extension Policy
// =============================================================================

/// Extension allow-list, executable block-list, size cap and markup scan.
#[derive(Debug, Clone)]
pub struct ExtensionPolicy {
    allowed: HashSet<String>,
    ignored: HashSet<String>,
    max_size: u64,
    scan_content: bool,
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EXTENSIONS.iter().copied())
    }
}

impl ExtensionPolicy {
    /// Allow the given extensions (case-insensitive), no size cap, content
    /// scan enabled.
    pub fn new<I, T>(allowed: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            allowed: lowercase_set(allowed),
            ignored: lowercase_set(DEFAULT_IGNORED_EXTENSIONS.iter().copied()),
            max_size: 0,
            scan_content: true,
        }
    }

    /// Skip the content scan for these extensions.
    pub fn with_ignored<I, T>(mut self, ignored: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.ignored = lowercase_set(ignored);
        self
    }

    /// Reject uploads larger than `bytes` (0 = unlimited).
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Enable or disable the markup scan of leading bytes.
    pub fn with_content_scan(mut self, enabled: bool) -> Self {
        self.scan_content = enabled;
        self
    }

    /// Checks that only need the name and size.
    pub fn check_name(&self, name: &str, size: u64) -> Result<String, String> {
        if name.is_empty() {
            return Err("Please input a file for upload.".to_string());
        }

        let segments: Vec<String> = name.split('.').map(|s| s.to_lowercase()).collect();
        // The first segment is the stem; only later ones act as extensions
        if segments
            .iter()
            .skip(1)
            .any(|s| EXECUTABLE_EXTENSIONS.contains(&s.as_str()))
        {
            return Err(format!("\"{}\" has an executable extension.", name));
        }

        let extension = match segments.last() {
            Some(ext) if segments.len() > 1 => ext.clone(),
            _ => return Err(format!("\"{}\" has no file extension.", name)),
        };
        if !self.allowed.contains(&extension) {
            return Err(format!("The \".{}\" file type is not allowed.", extension));
        }

        if self.max_size != 0 && size > self.max_size {
            return Err("This file is too large to upload.".to_string());
        }

        Ok(extension)
    }
}

#[async_trait]
impl UploadFilter for ExtensionPolicy {
    async fn can_upload(&self, candidate: &UploadCandidate) -> Result<(), String> {
        let extension = self.check_name(&candidate.name, candidate.size)?;

        if !self.scan_content || self.ignored.contains(&extension) {
            return Ok(());
        }

        let source = candidate.source.clone();
        let head = tokio::task::spawn_blocking(move || read_head(&source))
            .await
            .map_err(|e| format!("Unable to inspect upload: {}", e))?
            .map_err(|e| format!("Unable to inspect upload: {}", e))?;

        if let Some(tag) = find_markup(&head) {
            return Err(format!(
                "\"{}\" looks like markup (found <{}>) and was rejected.",
                candidate.name, tag
            ));
        }

        Ok(())
    }
}

fn lowercase_set<I, T>(items: I) -> HashSet<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn read_head(path: &std::path::Path) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SCAN_BYTES);
    std::fs::File::open(path)?
        .take(SCAN_BYTES as u64)
        .read_to_end(&mut head)?;
    Ok(head)
}

/// First XSS tag opened (`<tag>` or `<tag ` ) in `head`, if any.
fn find_markup(head: &[u8]) -> Option<&'static str> {
    let text = String::from_utf8_lossy(head).to_lowercase();

    XSS_TAGS.iter().copied().find(|tag| {
        let open = format!("<{}", tag);
        text.match_indices(&open).any(|(idx, _)| {
            match text[idx + open.len()..].chars().next() {
                // "<!--" needs nothing after it; real tags need a terminator
                _ if tag.starts_with("!--") => true,
                Some(c) => c == '>' || c.is_whitespace(),
                None => false,
            }
        })
    })
}

// =============================================================================
// Tests
// =============================================================================
