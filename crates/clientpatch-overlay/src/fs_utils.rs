use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

pub(crate) fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    if path.is_file() {
        fs::remove_file(path)?;
        return Ok(true);
    }
    Ok(false)
}

pub(crate) fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
        return Ok(true);
    }
    Ok(false)
}

pub(crate) fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

/// Every non-directory entry below `dir`, symlinks included; a missing `dir`
/// yields nothing.
pub(crate) fn files_under(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_dir() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Remove every empty directory below `root`, deepest first. `root` itself
/// and anything under `keep` survive.
pub(crate) fn remove_empty_dirs(root: &Path, keep: Option<&Path>) -> io::Result<usize> {
    if !root.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if keep.is_some_and(|keep| entry.path().starts_with(keep)) {
            continue;
        }
        if fs::read_dir(entry.path())?.next().is_none() {
            fs::remove_dir(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Walk up from the parent of `path`, removing empty directories until
/// `stop` or a non-empty directory is reached.
pub(crate) fn remove_empty_parents(path: &Path, stop: &Path) -> io::Result<usize> {
    let mut removed = 0;
    let mut current = path.parent();
    while let Some(dir) = current {
        if !dir.starts_with(stop) || dir == stop || !dir.is_dir() {
            break;
        }
        if fs::read_dir(dir)?.next().is_some() {
            break;
        }
        fs::remove_dir(dir)?;
        removed += 1;
        current = dir.parent();
    }
    Ok(removed)
}

/// Render a relative path with `/` separators for persisted records.
pub(crate) fn path_to_record(rel: &Path) -> String {
    rel.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse a persisted relative path. Returns `None` for absolute paths or
/// entries that climb out of their root.
pub(crate) fn record_to_path(entry: &str) -> Option<PathBuf> {
    let normalized = entry.replace('\\', "/");
    if normalized.trim().is_empty() {
        return None;
    }

    let path = PathBuf::from(normalized.trim_start_matches("./"));
    let safe = path.components().all(|component| {
        matches!(component, Component::Normal(_) | Component::CurDir)
    });
    safe.then_some(path)
}
