//! Lexical path handling for config files.
//!
//! Layer files are identified by their normalized path so that `a/../b.yaml`
//! and `b.yaml` count as the same file. Everything here is pure path
//! manipulation (no filesystem I/O).

use std::path::{Component, Path, PathBuf};

/// Normalize path components without requiring the file to exist.
/// Handles `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => components.push(Component::Prefix(p)),
            Component::RootDir => components.push(Component::RootDir),
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    // Leading `..` of a relative path must be kept; `/..` is `/`.
                    components.push(Component::ParentDir);
                }
            }
            Component::Normal(name) => components.push(Component::Normal(name)),
        }
    }

    if components.is_empty() {
        return PathBuf::from(".");
    }
    components.iter().collect()
}

/// Resolve `target` relative to the directory containing `file`.
///
/// Absolute targets are returned normalized but otherwise unchanged.
pub fn resolve_relative_to(file: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return normalize_path(target);
    }
    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&dir.join(target))
}
