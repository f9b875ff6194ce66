use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::{PatchError, Result};

/// File names that never get staged, compared case-insensitively.
pub const JUNK_FILENAMES: [&str; 4] = ["thumbs.db", ".ds_store", ".gitignore", ".gitkeep"];

/// One file queued for backup and copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Relative to the staging anchor, or absolute when the layer lives
    /// outside it.
    pub source: PathBuf,
    /// Relative to the target root.
    pub dest: PathBuf,
}

/// Accumulates staged files from overlay layers in priority order.
///
/// Layers staged later win when two files share a destination, since the
/// install phase writes in staging order.
#[derive(Debug, Clone)]
pub struct Stager {
    anchor: PathBuf,
    staged: Vec<StagedFile>,
}

impl Stager {
    pub fn new(anchor: impl Into<PathBuf>) -> Self {
        Self {
            anchor: anchor.into(),
            staged: Vec::new(),
        }
    }

    /// Stage every regular file below `source_dir`. Returns how many files
    /// this layer added.
    pub fn stage(&mut self, source_dir: &Path) -> Result<usize> {
        if !source_dir.is_dir() {
            return Err(PatchError::LayerMissing {
                path: source_dir.to_path_buf(),
            });
        }

        let before = self.staged.len();
        for entry in WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| source_dir.to_path_buf());
                PatchError::io("failed to walk overlay layer", path, err.into())
            })?;
            if !entry.file_type().is_file() || is_junk(entry.file_name()) {
                continue;
            }

            let path = entry.path();
            let Ok(dest) = path.strip_prefix(source_dir) else {
                continue;
            };
            let source = path.strip_prefix(&self.anchor).unwrap_or(path);
            self.staged.push(StagedFile {
                source: source.to_path_buf(),
                dest: dest.to_path_buf(),
            });
        }

        let added = self.staged.len() - before;
        debug!(layer = %source_dir.display(), files = added, "staged overlay layer");
        Ok(added)
    }

    pub fn staged(&self) -> &[StagedFile] {
        &self.staged
    }

    pub fn into_staged(self) -> Vec<StagedFile> {
        self.staged
    }
}

fn is_junk(name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy().to_lowercase();
    JUNK_FILENAMES.contains(&name.as_str())
}
