//! Revert records for generated files.
//!
//! Asset generators write new files instead of overwriting existing ones, so
//! undoing them needs no backups: the record lists what was created and a
//! revert deletes exactly that.

use std::path::{Path, PathBuf};

use clientpatch_core::{record_timestamp, GeneratedRecord, PatchLayout};
use tracing::{debug, info};

use crate::fs_utils::{path_to_record, record_to_path, remove_empty_parents, remove_file_if_exists};
use crate::session::{read_json, write_json};
use crate::{PatchError, Result};

/// Which recorded files a generated-file revert removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertScope {
    All,
    /// Only files under `RagexeClient/<version>/`.
    Version(String),
}

/// Recorder for files one generator feature created below `base_dir`.
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    base_dir: PathBuf,
    record_path: PathBuf,
    record: GeneratedRecord,
    // New entries since this recorder was opened.
    added: usize,
}

impl GeneratedFiles {
    pub fn open(base_dir: impl Into<PathBuf>, record_path: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            record_path: record_path.into(),
            record: GeneratedRecord::default(),
            added: 0,
        }
    }

    /// Recorder for `feature`, rooted at the patches directory.
    pub fn for_feature(layout: &PatchLayout, feature: &str) -> Result<Self> {
        let record_path = layout.generated_record_path(feature).map_err(|err| {
            PatchError::io("failed to create patches directory", layout.patches_dir(), err)
        })?;
        Ok(Self::open(layout.patches_dir(), record_path))
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    pub fn files(&self) -> &[String] {
        &self.record.files
    }

    /// Remember a created file. Absolute paths are made relative to the base
    /// directory; paths outside it are refused.
    pub fn record(&mut self, path: &Path) -> Result<()> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.base_dir)
                .map_err(|_| PatchError::UnsafeRecordPath {
                    path: self.record_path.clone(),
                    entry: path.display().to_string(),
                })?
                .to_path_buf()
        } else {
            path.to_path_buf()
        };

        let entry = path_to_record(&rel);
        if record_to_path(&entry).is_none() {
            return Err(PatchError::UnsafeRecordPath {
                path: self.record_path.clone(),
                entry,
            });
        }
        if !self.record.files.contains(&entry) {
            self.record.files.push(entry);
            self.added += 1;
        }
        Ok(())
    }

    /// Replace the in-memory list with the one on disk. Returns `false` when
    /// no record exists.
    pub fn load(&mut self) -> Result<bool> {
        match read_json::<GeneratedRecord>(&self.record_path)? {
            Some(record) => {
                for entry in &record.files {
                    if record_to_path(entry).is_none() {
                        return Err(PatchError::UnsafeRecordPath {
                            path: self.record_path.clone(),
                            entry: entry.clone(),
                        });
                    }
                }
                self.record = record;
                Ok(true)
            }
            None => {
                self.record = GeneratedRecord::default();
                Ok(false)
            }
        }
    }

    pub fn save(&mut self) -> Result<()> {
        self.record.timestamp = record_timestamp();
        write_json(&self.record_path, &self.record)
    }

    pub fn has_revert_info(&mut self) -> Result<bool> {
        self.load()?;
        Ok(!self.record.files.is_empty())
    }

    /// Delete recorded files in `scope`. The remaining entries are saved
    /// back; an emptied record is removed. Returns how many files were
    /// deleted.
    pub fn revert(&mut self, scope: &RevertScope) -> Result<usize> {
        self.load()?;

        let prefix = match scope {
            RevertScope::All => None,
            RevertScope::Version(version) => {
                Some(Path::new("RagexeClient").join(version))
            }
        };

        let mut removed = 0;
        let mut kept = Vec::new();
        for entry in std::mem::take(&mut self.record.files) {
            let Some(rel) = record_to_path(&entry) else {
                continue;
            };
            if prefix.as_ref().is_some_and(|prefix| !rel.starts_with(prefix)) {
                kept.push(entry);
                continue;
            }

            let path = self.base_dir.join(&rel);
            if remove_file_if_exists(&path)
                .map_err(|err| PatchError::io("failed to remove generated file", &path, err))?
            {
                removed += 1;
                debug!(path = %path.display(), "removed generated file");
            }
            remove_empty_parents(&path, &self.base_dir)
                .map_err(|err| PatchError::io("failed to prune empty directories", &path, err))?;
        }

        self.record.files = kept;
        if self.record.files.is_empty() {
            match std::fs::remove_file(&self.record_path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(PatchError::io(
                        "failed to remove generated-file record",
                        &self.record_path,
                        err,
                    ))
                }
            }
        } else {
            self.save()?;
        }

        info!(record = %self.record_path.display(), removed, "reverted generated files");
        Ok(removed)
    }
}

/// Producer of generated files, e.g. a button-image renderer. It reports
/// each file it creates through `out`.
pub trait AssetGenerator {
    fn generate(
        &mut self,
        layout: &PatchLayout,
        version: Option<&str>,
        out: &mut GeneratedFiles,
    ) -> Result<()>;
}

/// Run `generator` for `feature` and persist what it created on top of any
/// files an earlier run recorded.
pub fn run_generator(
    layout: &PatchLayout,
    feature: &str,
    generator: &mut dyn AssetGenerator,
    version: Option<&str>,
) -> Result<GeneratedFiles> {
    let mut files = GeneratedFiles::for_feature(layout, feature)?;
    files.load()?;

    let generated = generator.generate(layout, version, &mut files);
    // Whatever was reported before a failure still has to be revertible.
    if files.added > 0 || generated.is_ok() {
        files.save()?;
    }
    generated?;

    info!(feature, recorded = files.added, "recorded generated files");
    Ok(files)
}

pub fn revert_generated(layout: &PatchLayout, feature: &str, scope: &RevertScope) -> Result<usize> {
    GeneratedFiles::for_feature(layout, feature)?.revert(scope)
}
