//! Lexical path cleaning and base-directory containment.

use std::path::{Component, Path, PathBuf};

use crate::error::MediaError;

/// Lexically normalize a path.
///
/// Repeated separators and `.` components disappear, `..` pops the previous
/// normal component, and `..` directly under the root is dropped. The
/// filesystem is never consulted, so symlinks are not resolved.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => cleaned.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            Component::Normal(part) => cleaned.push(part),
        }
    }

    cleaned
}

/// Join `folder` and `name` onto `base` and require the cleaned result to be
/// a strict descendant of the cleaned base.
///
/// `name` may be empty, in which case the folder itself is resolved (and must
/// itself not be the base directory).
pub fn resolve_under(base: &Path, folder: &str, name: &str) -> Result<PathBuf, MediaError> {
    let base = clean_path(base);

    let mut joined = base.clone();
    if !folder.is_empty() {
        joined.push(folder);
    }
    if !name.is_empty() {
        joined.push(name);
    }
    let resolved = clean_path(&joined);

    if resolved != base && resolved.starts_with(&base) {
        Ok(resolved)
    } else {
        let requested = match (folder.is_empty(), name.is_empty()) {
            (true, _) => name.to_string(),
            (false, true) => folder.to_string(),
            (false, false) => format!("{}/{}", folder, name),
        };
        Err(MediaError::PathUnsafe { path: requested })
    }
}

/// Render `path` relative to `base` with a leading `/`, the form used in
/// status messages (for example `/images/logo.png`).
pub fn relative_display(base: &Path, path: &Path) -> String {
    let base = clean_path(base);
    let path = clean_path(path);

    match path.strip_prefix(&base) {
        Ok(rest) => {
            let parts: Vec<String> = rest
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            format!("/{}", parts.join("/"))
        }
        Err(_) => path.display().to_string(),
    }
}
