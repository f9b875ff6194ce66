use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::PatchConfig;

const PATCHES_DIR: &str = "Patches";
const VERSIONS_DIR: &str = "RagexeClient";
const SESSION_RECORD_FILE: &str = "LastPatchesInfo.json";
const JOURNAL_FILE: &str = "PatchJournal.jsonl";

/// Maps logical patcher locations to filesystem paths.
///
/// Directory-returning methods always end in the platform separator. Nothing
/// here touches the disk except the record-path methods, which create the
/// patches directory on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchLayout {
    target_root: PathBuf,
    patch_root: PathBuf,
    volatile_dirs: Vec<String>,
}

impl PatchLayout {
    pub fn new(config: &PatchConfig) -> Self {
        Self {
            target_root: config.target_root.clone(),
            patch_root: config.patch_root.clone(),
            volatile_dirs: config.volatile_dirs.clone(),
        }
    }

    pub fn target_root(&self) -> PathBuf {
        as_dir(self.target_root.clone())
    }

    pub fn patch_root(&self) -> PathBuf {
        as_dir(self.patch_root.clone())
    }

    pub fn patches_dir(&self) -> PathBuf {
        as_dir(self.patch_root.join(PATCHES_DIR))
    }

    pub fn common_dir(&self) -> PathBuf {
        as_dir(self.patches_dir().join("Common"))
    }

    pub fn before_common_dir(&self) -> PathBuf {
        as_dir(self.common_dir().join("BeforePatches"))
    }

    pub fn after_common_dir(&self) -> PathBuf {
        as_dir(self.common_dir().join("AfterPatches"))
    }

    pub fn versions_dir(&self) -> PathBuf {
        as_dir(self.patches_dir().join(VERSIONS_DIR))
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        as_dir(self.versions_dir().join(version))
    }

    pub fn version_build_dir(&self, version: &str) -> PathBuf {
        as_dir(self.version_dir(version).join("Ragexe").join("Build"))
    }

    pub fn version_origin_dir(&self, version: &str) -> PathBuf {
        as_dir(self.version_dir(version).join("Resource").join("Original"))
    }

    pub fn version_translated_dir(&self, version: &str) -> PathBuf {
        as_dir(self.version_dir(version).join("Resource").join("Translated"))
    }

    /// Overlay layers for one client version, lowest priority first.
    pub fn overlay_layers(&self, version: &str) -> [PathBuf; 5] {
        [
            self.before_common_dir(),
            self.version_build_dir(version),
            self.version_origin_dir(version),
            self.version_translated_dir(version),
            self.after_common_dir(),
        ]
    }

    pub fn backup_dir(&self) -> PathBuf {
        as_dir(self.patches_dir().join("Backup"))
    }

    pub fn session_record_path(&self) -> io::Result<PathBuf> {
        let dir = self.patches_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir.join(SESSION_RECORD_FILE))
    }

    pub fn journal_path(&self) -> PathBuf {
        self.patches_dir().join(JOURNAL_FILE)
    }

    /// Record file of a generated-file feature, e.g. `LastButtonTransInfo`.
    pub fn generated_record_path(&self, feature: &str) -> io::Result<PathBuf> {
        let dir = self.patches_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir.join(format!("{feature}.json")))
    }

    pub fn volatile_dirs(&self) -> Vec<PathBuf> {
        self.volatile_dirs
            .iter()
            .map(|dir| as_dir(self.target_root.join(dir)))
            .collect()
    }

    pub fn source_path(&self, rel: &Path) -> PathBuf {
        self.patch_root.join(rel)
    }

    pub fn dest_path(&self, rel: &Path) -> PathBuf {
        self.target_root.join(rel)
    }

    pub fn backup_path(&self, rel: &Path) -> PathBuf {
        self.backup_dir().join(rel)
    }

    /// Client versions that have an overlay directory, sorted by name.
    pub fn available_versions(&self) -> io::Result<Vec<String>> {
        let dir = self.versions_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.eq_ignore_ascii_case("common") {
                continue;
            }
            versions.push(name);
        }
        versions.sort();
        Ok(versions)
    }

    /// Expected patch-source directories that are missing on disk.
    pub fn missing_dirs(&self) -> Vec<PathBuf> {
        [
            self.patches_dir(),
            self.versions_dir(),
            self.before_common_dir(),
            self.after_common_dir(),
        ]
        .into_iter()
        .filter(|dir| !dir.is_dir())
        .collect()
    }
}

fn as_dir(mut path: PathBuf) -> PathBuf {
    // Pushing an empty component appends the trailing separator.
    path.push("");
    path
}
