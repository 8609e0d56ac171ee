//! Lexical path helpers
//!
//! Nothing here touches the filesystem, so symlinks are never resolved:
//! - `.` segments are dropped.
//! - `..` pops the preceding normal segment; on absolute paths it cannot
//!   climb above the root (`/../etc` becomes `/etc`).
//! - Leading `..` on relative paths is preserved.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR, MAIN_SEPARATOR_STR};

/// Normalize a path without consulting the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut prefix: Option<OsString> = None;
    let mut has_root = false;
    let mut segments: Vec<Component<'_>> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(segments.last(), Some(Component::Normal(_))) {
                    segments.pop();
                } else if !has_root {
                    segments.push(comp);
                }
            }
            Component::Normal(_) => segments.push(comp),
            Component::RootDir => has_root = true,
            Component::Prefix(p) => prefix = Some(p.as_os_str().to_os_string()),
        }
    }

    let mut out = PathBuf::new();
    if let Some(prefix) = prefix {
        out.push(prefix);
    }
    if has_root {
        out.push(MAIN_SEPARATOR_STR);
    }
    for segment in segments {
        out.push(segment.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve `path` against `cwd` and normalize, like `path.resolve(cwd, path)`
///
/// An absolute `path` replaces `cwd` entirely.
pub fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    normalize(&cwd.join(path))
}

/// Make `path` absolute using the process working directory
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    Ok(resolve(&std::env::current_dir()?, path))
}

/// Append exactly one trailing separator
pub fn with_trailing_separator(path: PathBuf) -> PathBuf {
    if has_trailing_separator(&path) {
        return path;
    }
    let mut raw = path.into_os_string();
    raw.push(MAIN_SEPARATOR_STR);
    PathBuf::from(raw)
}

pub fn has_trailing_separator(path: &Path) -> bool {
    let raw = path.as_os_str().to_string_lossy();
    raw.ends_with(MAIN_SEPARATOR) || (cfg!(windows) && raw.ends_with('/'))
}

/// `path` relative to `base`, or `None` when `path` is not under `base`
///
/// Both sides are compared after normalization, so a trailing separator on
/// `base` does not matter.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    let path = normalize(path);
    let base = normalize(base);
    path.strip_prefix(&base).ok().map(Path::to_path_buf)
}
