//! Transactional overlay of patch files onto a client installation.
//!
//! [`PatchManager`] is the usual entry point. The pieces it composes
//! ([`Stager`], [`PatchTransaction`], [`RevertEngine`], [`SessionStore`]) are
//! public for callers that build their own overlay sets.

mod error;
mod fs_utils;
mod generated;
mod journal;
mod manager;
mod progress;
mod revert;
mod session;
mod stage;
mod transaction;

pub use error::{PatchError, Result};
pub use generated::{revert_generated, run_generator, AssetGenerator, GeneratedFiles, RevertScope};
pub use manager::{ApplyReport, PatchManager, PatchStatus};
pub use progress::{NoProgress, ProgressReporter};
pub use revert::{RevertEngine, RevertReport};
pub use session::SessionStore;
pub use stage::{StagedFile, Stager, JUNK_FILENAMES};
pub use transaction::{PatchTransaction, TransactionState};
