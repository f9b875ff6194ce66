//! Commit journal.
//!
//! While a commit runs, every completed backup and every install about to
//! start is appended to `PatchJournal.jsonl`. The file only survives if the
//! process dies mid-commit; the next revert then rebuilds a session record
//! from it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clientpatch_core::{InstalledFile, SessionRecord};
use serde::{Deserialize, Serialize};

use crate::{PatchError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct JournalEntry {
    pub(crate) seq: u64,
    #[serde(flatten)]
    pub(crate) step: JournalStep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub(crate) enum JournalStep {
    Backup { dst: String },
    Install { src: String, dst: String },
}

pub(crate) struct CommitJournal {
    path: PathBuf,
    file: File,
    seq: u64,
}

impl CommitJournal {
    pub(crate) fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                PatchError::io("failed to create journal directory", parent, err)
            })?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|err| PatchError::io("failed to open commit journal", path, err))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            seq: 0,
        })
    }

    pub(crate) fn append(&mut self, step: JournalStep) -> io::Result<()> {
        self.seq += 1;
        let entry = JournalEntry {
            seq: self.seq,
            step,
        };
        let mut line = serde_json::to_string(&entry).map_err(io::Error::from)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()
    }

    pub(crate) fn discard(self) -> io::Result<()> {
        drop(self.file);
        fs::remove_file(&self.path)
    }
}

/// Rebuild the session record of an interrupted commit. Returns `None` when
/// no journal exists.
pub(crate) fn read_journal(path: &Path, timestamp: &str) -> Result<Option<SessionRecord>> {
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

    let lines = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    let mut record = SessionRecord::new(timestamp);
    for (index, line) in lines.iter().enumerate() {
        let entry: JournalEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            // A crash can cut the final line short.
            Err(_) if index + 1 == lines.len() => break,
            Err(err) => {
                return Err(PatchError::RecordParse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        };
        match entry.step {
            JournalStep::Backup { dst } => {
                if !record.backed_up.contains(&dst) {
                    record.backed_up.push(dst);
                }
            }
            JournalStep::Install { src, dst } => record.installed.push(InstalledFile { src, dst }),
        }
    }

    Ok(Some(record))
}

pub(crate) fn remove_journal(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(PatchError::io("failed to remove commit journal", path, err)),
    }
}
