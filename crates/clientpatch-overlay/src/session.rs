use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clientpatch_core::{PatchLayout, SessionRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::fs_utils::record_to_path;
use crate::{PatchError, Result};

/// Durable home of the last committed session record.
#[derive(Debug, Clone, Copy)]
pub struct SessionStore<'a> {
    layout: &'a PatchLayout,
}

impl<'a> SessionStore<'a> {
    pub fn new(layout: &'a PatchLayout) -> Self {
        Self { layout }
    }

    pub fn path(&self) -> Result<PathBuf> {
        self.layout.session_record_path().map_err(|err| {
            PatchError::io(
                "failed to create patches directory",
                self.layout.patches_dir(),
                err,
            )
        })
    }

    /// Load the committed record, or `None` when nothing is applied.
    pub fn load(&self) -> Result<Option<SessionRecord>> {
        let path = self.path()?;
        let Some(record) = read_json::<SessionRecord>(&path)? else {
            return Ok(None);
        };

        let destinations = record
            .backed_up
            .iter()
            .chain(record.installed.iter().map(|file| &file.dst));
        for entry in destinations {
            if record_to_path(entry).is_none() {
                return Err(PatchError::UnsafeRecordPath {
                    path,
                    entry: entry.clone(),
                });
            }
        }
        Ok(Some(record))
    }

    /// Write the record, replacing any previous one.
    pub fn save(&self, record: &SessionRecord) -> Result<PathBuf> {
        let path = self.path()?;
        write_json(&path, record)?;
        Ok(path)
    }

    pub fn remove(&self) -> Result<()> {
        let path = self.path()?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PatchError::io("failed to remove session record", path, err)),
        }
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.path()?.is_file())
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(PatchError::RecordRead {
                path: path.to_path_buf(),
                source: err,
            })
        }
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|err| PatchError::RecordParse {
            path: path.to_path_buf(),
            source: err,
        })
}

// Written through a sibling temp file and renamed so a crash never leaves a
// truncated record behind.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let write_err = |source: io::Error| PatchError::RecordWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut payload = serde_json::to_string_pretty(value).map_err(|err| write_err(err.into()))?;
    payload.push('\n');

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, payload.as_bytes()).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(|err| {
        let _ = fs::remove_file(&tmp);
        write_err(err)
    })
}
