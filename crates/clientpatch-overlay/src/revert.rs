use std::fs;

use clientpatch_core::{record_timestamp, InstalledFile, PatchLayout, SessionRecord};
use tracing::{debug, info, warn};

use crate::fs_utils::{
    copy_file, files_under, record_to_path, remove_dir_if_exists, remove_empty_dirs,
    remove_file_if_exists,
};
use crate::journal::{read_journal, remove_journal};
use crate::{NoProgress, PatchError, ProgressReporter, Result, SessionStore};

/// What a revert or rollback changed on disk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RevertReport {
    pub removed_installed: usize,
    pub removed_volatile: usize,
    pub restored: usize,
    pub pruned_dirs: usize,
    /// The record came from the journal of an interrupted commit.
    pub recovered_journal: bool,
}

impl RevertReport {
    pub fn is_noop(&self) -> bool {
        self.removed_installed == 0
            && self.removed_volatile == 0
            && self.restored == 0
            && self.pruned_dirs == 0
    }
}

/// Undoes a recorded patch session.
#[derive(Debug, Clone, Copy)]
pub struct RevertEngine<'a> {
    layout: &'a PatchLayout,
}

impl<'a> RevertEngine<'a> {
    pub fn new(layout: &'a PatchLayout) -> Self {
        Self { layout }
    }

    pub fn revert(&self) -> Result<RevertReport> {
        self.revert_with_progress(&mut NoProgress)
    }

    /// Revert the last committed session, or the interrupted commit left in
    /// the journal. With neither on disk only volatile directories are
    /// emptied.
    pub fn revert_with_progress(
        &self,
        progress: &mut dyn ProgressReporter,
    ) -> Result<RevertReport> {
        let store = SessionStore::new(self.layout);
        if let Some(record) = store.load()? {
            return self.undo(&record, &[], true, progress);
        }

        let journal = self.layout.journal_path();
        if let Some(record) = read_journal(&journal, &record_timestamp())? {
            warn!(journal = %journal.display(), "recovering interrupted commit from journal");
            let mut report = self.undo(&record, &[], true, progress)?;
            report.recovered_journal = true;
            return Ok(report);
        }

        let removed_volatile = self.purge_volatile(progress)?;
        progress.finish();
        Ok(RevertReport {
            removed_volatile,
            ..RevertReport::default()
        })
    }

    /// True when a revert would change anything: a committed session (even
    /// one that installed nothing), an interrupted commit, or files in
    /// volatile directories.
    pub fn has_something_to_revert(&self) -> Result<bool> {
        if SessionStore::new(self.layout).load()?.is_some() {
            return Ok(true);
        }
        if self.layout.journal_path().is_file() {
            return Ok(true);
        }
        for dir in self.layout.volatile_dirs() {
            let files = files_under(&dir)
                .map_err(|err| PatchError::io("failed to scan volatile directory", &dir, err))?;
            if !files.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Undo a commit that failed part way, using its in-memory record.
    /// Volatile directories are left alone; the commit never touched them.
    pub(crate) fn rollback(
        &self,
        record: &SessionRecord,
        pending: Option<&InstalledFile>,
    ) -> Result<RevertReport> {
        let pending = pending.cloned().into_iter().collect::<Vec<_>>();
        self.undo(record, &pending, false, &mut NoProgress)
    }

    fn undo(
        &self,
        record: &SessionRecord,
        pending: &[InstalledFile],
        purge_volatile: bool,
        progress: &mut dyn ProgressReporter,
    ) -> Result<RevertReport> {
        let mut report = RevertReport::default();

        let installed = record.installed.iter().chain(pending);
        progress.start("remove", record.installed.len() + pending.len());
        for file in installed {
            let Some(rel) = record_to_path(&file.dst) else {
                continue;
            };
            let dest = self.layout.dest_path(&rel);
            let removed = remove_file_if_exists(&dest)
                .map_err(|err| PatchError::io("failed to remove installed file", &dest, err))?;
            if removed {
                report.removed_installed += 1;
                debug!(path = %dest.display(), "removed installed file");
            }
            progress.advance(&file.dst);
        }

        if purge_volatile {
            report.removed_volatile = self.purge_volatile(progress)?;
        }

        progress.start("restore", record.backed_up.len());
        for entry in &record.backed_up {
            let Some(rel) = record_to_path(entry) else {
                continue;
            };
            let backup = self.layout.backup_path(&rel);
            let dest = self.layout.dest_path(&rel);
            copy_file(&backup, &dest)
                .map_err(|err| PatchError::RestoreFailed { path: dest, source: err })?;
            report.restored += 1;
            progress.advance(entry);
        }

        let backup_dir = self.layout.backup_dir();
        remove_dir_if_exists(&backup_dir)
            .map_err(|err| PatchError::io("failed to remove backup directory", &backup_dir, err))?;
        SessionStore::new(self.layout).remove()?;
        remove_journal(&self.layout.journal_path())?;

        let target_root = self.layout.target_root();
        let patch_root = self.layout.patch_root();
        report.pruned_dirs = remove_empty_dirs(&target_root, Some(&patch_root))
            .map_err(|err| PatchError::io("failed to prune empty directories", &target_root, err))?;
        progress.finish();

        info!(
            removed = report.removed_installed,
            restored = report.restored,
            volatile = report.removed_volatile,
            pruned = report.pruned_dirs,
            "reverted patch session"
        );
        Ok(report)
    }

    fn purge_volatile(&self, progress: &mut dyn ProgressReporter) -> Result<usize> {
        let mut removed = 0;
        let dirs = self.layout.volatile_dirs();
        progress.start("clean", dirs.len());
        for dir in dirs {
            let files = files_under(&dir)
                .map_err(|err| PatchError::io("failed to scan volatile directory", &dir, err))?;
            for file in files {
                fs::remove_file(&file)
                    .map_err(|err| PatchError::io("failed to remove volatile file", &file, err))?;
                removed += 1;
            }
            progress.advance(&dir.display().to_string());
        }
        Ok(removed)
    }
}
