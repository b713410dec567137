//! Filename sanitization and the folder parameter filter.

use crate::error::MediaError;

/// Strip a filename down to characters that are safe on every filesystem.
///
/// Applied in order:
/// 1. trailing dots are trimmed
/// 2. runs of two or more dots are removed
/// 3. every character outside `[A-Za-z0-9._- ]` is removed
/// 4. a single leading dot is removed
/// 5. surrounding whitespace is trimmed
///
/// Path separators never survive step 3, so the result is always a single
/// path component (possibly empty).
pub fn make_safe(name: &str) -> String {
    let without_dot_runs = remove_dot_runs(name.trim_end_matches('.'));

    let filtered: String = without_dot_runs
        .chars()
        .filter(|c| is_safe_name_char(*c))
        .collect();

    let stripped = filtered.strip_prefix('.').unwrap_or(&filtered);
    stripped.trim().to_string()
}

/// True when `path` is non-empty and survives [`make_safe`] unchanged.
///
/// Anything carrying a separator, a `..` segment or an unsafe character fails.
pub fn is_safe_relative_path(path: &str) -> bool {
    !path.is_empty() && path == make_safe(path)
}

/// Validate the `folder` request parameter.
///
/// Accepts the empty string (the base directory itself) or a relative path of
/// `/`- or `\`-separated segments made of `[A-Za-z0-9_.-]`. Absolute paths,
/// empty segments, `.` and `..` are rejected. Trailing separators are dropped
/// and the result always uses `/`.
pub fn filter_folder(raw: &str) -> Result<String, MediaError> {
    let trimmed = raw.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let unsafe_folder = || MediaError::PathUnsafe {
        path: raw.to_string(),
    };

    if trimmed.starts_with(['/', '\\']) {
        return Err(unsafe_folder());
    }

    let mut segments = Vec::new();
    for segment in trimmed.split(['/', '\\']) {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(unsafe_folder());
        }
        if !segment.chars().all(is_folder_char) {
            return Err(unsafe_folder());
        }
        segments.push(segment);
    }

    Ok(segments.join("/"))
}

fn is_safe_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ')
}

fn is_folder_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn remove_dot_runs(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut dots = 0usize;

    for c in input.chars() {
        if c == '.' {
            dots += 1;
            continue;
        }
        if dots == 1 {
            out.push('.');
        }
        dots = 0;
        out.push(c);
    }
    if dots == 1 {
        out.push('.');
    }

    out
}
