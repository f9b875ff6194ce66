use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use clientpatch_core::{record_timestamp, InstalledFile, PatchLayout, SessionRecord};
use tracing::{debug, error, info, warn};

use crate::fs_utils::{path_to_record, remove_dir_if_exists};
use crate::journal::{CommitJournal, JournalStep};
use crate::{PatchError, ProgressReporter, Result, RevertEngine, SessionStore, StagedFile};

/// Lifecycle of one patch transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Empty,
    Staged,
    Verified,
    BackedUp,
    Committed,
    /// A commit failed and the target root was restored.
    RolledBack,
    /// A commit failed and so did its rollback.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CopyPhase {
    Backup,
    Install,
}

/// Backup-then-copy of a staged file list with rollback on any failure.
///
/// The session record is written only after every file is installed, so the
/// previous revert point stays on disk until the new one fully exists.
pub struct PatchTransaction<'a> {
    layout: &'a PatchLayout,
    state: TransactionState,
    staged: Vec<StagedFile>,
    record: SessionRecord,
    pending: Option<InstalledFile>,
}

impl<'a> PatchTransaction<'a> {
    pub fn new(layout: &'a PatchLayout) -> Self {
        Self {
            layout,
            state: TransactionState::Empty,
            staged: Vec::new(),
            record: SessionRecord::default(),
            pending: None,
        }
    }

    /// Reset the in-memory lists. Nothing on disk changes.
    pub fn begin(&mut self) {
        self.staged.clear();
        self.record = SessionRecord::default();
        self.pending = None;
        self.state = TransactionState::Empty;
    }

    pub fn stage(&mut self, files: impl IntoIterator<Item = StagedFile>) {
        self.staged.extend(files);
        self.state = TransactionState::Staged;
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn staged(&self) -> &[StagedFile] {
        &self.staged
    }

    /// Confirm every staged source resolves to a regular file. Stops at the
    /// first missing one.
    pub fn verify_sources(&mut self) -> Result<()> {
        for file in &self.staged {
            let source = self.layout.source_path(&file.source);
            if !source.is_file() {
                return Err(PatchError::SourceMissing { path: source });
            }
        }
        self.state = TransactionState::Verified;
        Ok(())
    }

    pub fn commit(&mut self, progress: &mut dyn ProgressReporter) -> Result<&SessionRecord> {
        self.commit_with_copier(progress, |_, src, dst| fs::copy(src, dst).map(|_| ()))
    }

    pub(crate) fn commit_with_copier<C>(
        &mut self,
        progress: &mut dyn ProgressReporter,
        mut copier: C,
    ) -> Result<&SessionRecord>
    where
        C: FnMut(CopyPhase, &Path, &Path) -> io::Result<()>,
    {
        match self.state {
            TransactionState::Staged => {
                if let Err(err) = self.verify_sources() {
                    self.state = TransactionState::RolledBack;
                    return Err(err);
                }
            }
            TransactionState::Verified => {}
            state => return Err(PatchError::TransactionClosed { state }),
        }

        self.ensure_no_live_session()?;
        self.record = SessionRecord::new(record_timestamp());
        self.pending = None;

        let backup_dir = self.layout.backup_dir();
        remove_dir_if_exists(&backup_dir).map_err(|err| PatchError::BackupWriteFailed {
            path: backup_dir.clone(),
            source: err,
        })?;
        let mut journal = CommitJournal::create(&self.layout.journal_path())?;

        let applied = self.run_phases(&mut journal, progress, &mut copier);
        progress.finish();

        match applied {
            Ok(()) => {
                if let Err(err) = journal.discard() {
                    warn!(error = %err, "failed to remove commit journal");
                }
                self.state = TransactionState::Committed;
                info!(
                    installed = self.record.installed.len(),
                    backed_up = self.record.backed_up.len(),
                    "committed patch session"
                );
                Ok(&self.record)
            }
            Err(trigger) => {
                drop(journal);
                Err(self.roll_back(trigger))
            }
        }
    }

    fn run_phases<C>(
        &mut self,
        journal: &mut CommitJournal,
        progress: &mut dyn ProgressReporter,
        copier: &mut C,
    ) -> Result<()>
    where
        C: FnMut(CopyPhase, &Path, &Path) -> io::Result<()>,
    {
        self.backup_phase(journal, progress, copier)?;
        self.install_phase(journal, progress, copier)?;
        SessionStore::new(self.layout).save(&self.record)?;
        Ok(())
    }

    fn ensure_no_live_session(&self) -> Result<()> {
        let store = SessionStore::new(self.layout);
        if store.exists()? {
            return Err(PatchError::SessionActive {
                record: store.path()?,
            });
        }
        let journal = self.layout.journal_path();
        if journal.is_file() {
            return Err(PatchError::InterruptedSession { journal });
        }
        Ok(())
    }

    fn backup_phase<C>(
        &mut self,
        journal: &mut CommitJournal,
        progress: &mut dyn ProgressReporter,
        copier: &mut C,
    ) -> Result<()>
    where
        C: FnMut(CopyPhase, &Path, &Path) -> io::Result<()>,
    {
        progress.start("backup", self.staged.len());
        let mut seen = HashSet::new();
        for file in &self.staged {
            let dest = self.layout.dest_path(&file.dest);
            let dst = path_to_record(&file.dest);
            if dest.is_file() && seen.insert(dst.clone()) {
                let backup = self.layout.backup_path(&file.dest);
                let backup_err = |err: io::Error| PatchError::BackupWriteFailed {
                    path: dest.clone(),
                    source: err,
                };
                if let Some(parent) = backup.parent() {
                    fs::create_dir_all(parent).map_err(backup_err)?;
                }
                copier(CopyPhase::Backup, &dest, &backup).map_err(backup_err)?;
                self.record.backed_up.push(dst.clone());
                journal
                    .append(JournalStep::Backup { dst: dst.clone() })
                    .map_err(backup_err)?;
                debug!(path = %dest.display(), "backed up");
            }
            progress.advance(&dst);
        }
        self.state = TransactionState::BackedUp;
        Ok(())
    }

    fn install_phase<C>(
        &mut self,
        journal: &mut CommitJournal,
        progress: &mut dyn ProgressReporter,
        copier: &mut C,
    ) -> Result<()>
    where
        C: FnMut(CopyPhase, &Path, &Path) -> io::Result<()>,
    {
        progress.start("install", self.staged.len());
        for file in &self.staged {
            let source = self.layout.source_path(&file.source);
            let dest = self.layout.dest_path(&file.dest);
            let entry = InstalledFile {
                src: path_to_record(&file.source),
                dst: path_to_record(&file.dest),
            };
            let install_err = |err: io::Error| PatchError::InstallWriteFailed {
                path: dest.clone(),
                source: err,
            };

            // Logged before the write so an interrupted install is still
            // removed on recovery.
            journal
                .append(JournalStep::Install {
                    src: entry.src.clone(),
                    dst: entry.dst.clone(),
                })
                .map_err(install_err)?;
            self.pending = Some(entry.clone());

            if !source.is_file() {
                return Err(PatchError::SourceMissing { path: source });
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(install_err)?;
            }
            if dest.exists() {
                fs::remove_file(&dest).map_err(install_err)?;
            }
            copier(CopyPhase::Install, &source, &dest).map_err(install_err)?;

            self.pending = None;
            progress.advance(&entry.dst);
            self.record.installed.push(entry);
        }
        Ok(())
    }

    fn roll_back(&mut self, trigger: PatchError) -> PatchError {
        warn!(error = %trigger, "commit failed, rolling back");
        let engine = RevertEngine::new(self.layout);
        match engine.rollback(&self.record, self.pending.as_ref()) {
            Ok(_) => {
                self.state = TransactionState::RolledBack;
                trigger
            }
            Err(rollback) => {
                error!(error = %rollback, "rollback failed");
                self.state = TransactionState::Failed;
                PatchError::RollbackFailed {
                    trigger: Box::new(trigger),
                    rollback: Box::new(rollback),
                }
            }
        }
    }
}
