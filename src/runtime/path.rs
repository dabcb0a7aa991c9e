//! Lexical path helpers used when resolving paths read from untrusted metadata.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Returns true if `path` is `dir` or lies below it, after normalizing both.
///
/// `/staging/archive/../../etc` is NOT under `/staging`.
pub(crate) fn is_path_under(path: &Path, dir: &Path) -> bool {
    let path = normalize_path(path);
    let dir = normalize_path(dir);
    path.starts_with(&dir)
}

/// Join a relative sub-path taken from metadata onto `base`, refusing results
/// that escape `base`.
pub fn join_within(base: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative.is_absolute() {
        return None;
    }
    let joined = normalize_path(&base.join(relative));
    is_path_under(&joined, base).then_some(joined)
}
