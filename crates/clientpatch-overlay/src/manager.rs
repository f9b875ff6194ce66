use std::path::PathBuf;

use clientpatch_core::{PatchLayout, SessionRecord};
use tracing::info;

use crate::{
    NoProgress, PatchError, PatchTransaction, ProgressReporter, Result, RevertEngine,
    RevertReport, SessionStore, Stager,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub version: String,
    pub timestamp: String,
    pub staged: usize,
    pub installed: usize,
    pub backed_up: usize,
    pub record_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchStatus {
    /// Last committed session, if any.
    pub session: Option<SessionRecord>,
    pub interrupted: bool,
    pub has_something_to_revert: bool,
    pub available_versions: Vec<String>,
    pub missing_dirs: Vec<PathBuf>,
}

/// Entry point for collaborators: apply a client version's overlay, ask
/// whether anything is patched, revert to a clean state.
#[derive(Debug, Clone, Copy)]
pub struct PatchManager<'a> {
    layout: &'a PatchLayout,
}

impl<'a> PatchManager<'a> {
    pub fn new(layout: &'a PatchLayout) -> Self {
        Self { layout }
    }

    pub fn apply_patch(&self, version: &str) -> Result<ApplyReport> {
        self.apply_patch_with_progress(version, &mut NoProgress)
    }

    /// Stage the overlay layers of `version` and commit them. On error the
    /// target root is already back in its pre-apply state, except for
    /// `RollbackFailed`.
    pub fn apply_patch_with_progress(
        &self,
        version: &str,
        progress: &mut dyn ProgressReporter,
    ) -> Result<ApplyReport> {
        let available = self.layout.available_versions().map_err(|err| {
            PatchError::io("failed to list client versions", self.layout.versions_dir(), err)
        })?;
        if !available.iter().any(|candidate| candidate == version) {
            return Err(PatchError::UnknownVersion {
                version: version.to_string(),
                available,
            });
        }

        let layers = self.layout.overlay_layers(version);
        if let Some(missing) = layers.iter().find(|layer| !layer.is_dir()) {
            return Err(PatchError::LayerMissing {
                path: missing.clone(),
            });
        }

        let mut stager = Stager::new(self.layout.patch_root());
        for layer in &layers {
            stager.stage(layer)?;
        }

        let mut transaction = PatchTransaction::new(self.layout);
        transaction.begin();
        transaction.stage(stager.into_staged());
        transaction.verify_sources()?;
        let staged = transaction.staged().len();
        let record = transaction.commit(progress)?;

        let report = ApplyReport {
            version: version.to_string(),
            timestamp: record.timestamp.clone(),
            staged,
            installed: record.installed.len(),
            backed_up: record.backed_up.len(),
            record_path: SessionStore::new(self.layout).path()?,
        };
        info!(
            version,
            installed = report.installed,
            backed_up = report.backed_up,
            "applied patch"
        );
        Ok(report)
    }

    pub fn has_something_to_revert(&self) -> Result<bool> {
        RevertEngine::new(self.layout).has_something_to_revert()
    }

    pub fn revert_patch(&self) -> Result<RevertReport> {
        self.revert_patch_with_progress(&mut NoProgress)
    }

    pub fn revert_patch_with_progress(
        &self,
        progress: &mut dyn ProgressReporter,
    ) -> Result<RevertReport> {
        RevertEngine::new(self.layout).revert_with_progress(progress)
    }

    pub fn status(&self) -> Result<PatchStatus> {
        let session = SessionStore::new(self.layout).load()?;
        let available_versions = self.layout.available_versions().map_err(|err| {
            PatchError::io("failed to list client versions", self.layout.versions_dir(), err)
        })?;
        Ok(PatchStatus {
            session,
            interrupted: self.layout.journal_path().is_file(),
            has_something_to_revert: self.has_something_to_revert()?,
            available_versions,
            missing_dirs: self.layout.missing_dirs(),
        })
    }
}
