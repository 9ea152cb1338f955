//! Overwrite resolution state machine
//!
//! One resolver lives for the duration of a batch and is threaded through its
//! loop. While in [`BatchState::Ask`] every conflict is handed to the
//! callbacks; an `*All` answer moves the batch into a state that decides the
//! remaining conflicts without asking. `Cancel` is terminal.

use std::path::{Path, PathBuf};

use super::Conflict;
use crate::callbacks::SyncCallbacks;
use crate::logging::*;
use crate::strategies::{OverwriteChoice, OverwritePolicy};

/// Batch-wide overwrite state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
	Ask,
	BackupAll,
	OverwriteAll,
	SkipAll,
	Cancelled,
}

/// What to do with the file in conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	/// Replace the existing content
	Overwrite,

	/// Save the existing content as a backup, then replace it
	BackupAndOverwrite,

	/// Leave both sides as they are
	Skip,

	/// Stop the batch; this file is not attempted
	Cancel,
}

/// Decides overwrite conflicts for one batch
#[derive(Debug, Clone)]
pub struct OverwriteResolver {
	state: BatchState,

	/// Directory receiving the batch's backups, created on first use
	backup_dir: Option<PathBuf>,
}

impl OverwriteResolver {
	/// Create a resolver starting from the configured policy
	pub fn new(policy: OverwritePolicy) -> Self {
		let state = match policy {
			OverwritePolicy::Ask => BatchState::Ask,
			OverwritePolicy::Overwrite => BatchState::OverwriteAll,
			OverwritePolicy::Skip => BatchState::SkipAll,
			OverwritePolicy::Backup => BatchState::BackupAll,
		};
		OverwriteResolver { state, backup_dir: None }
	}

	pub fn state(&self) -> BatchState {
		self.state
	}

	pub fn is_cancelled(&self) -> bool {
		self.state == BatchState::Cancelled
	}

	pub fn backup_dir(&self) -> Option<&Path> {
		self.backup_dir.as_deref()
	}

	pub(crate) fn set_backup_dir(&mut self, dir: PathBuf) {
		self.backup_dir = Some(dir);
	}

	/// Decide a conflict, asking the callbacks only while in `Ask`
	pub fn resolve(&mut self, conflict: &Conflict, callbacks: &dyn SyncCallbacks) -> Resolution {
		let resolution = match self.state {
			BatchState::Ask => {
				let choice = callbacks.on_conflict(conflict);
				debug!("{}: answered {}", conflict.path.display(), choice);
				self.apply(choice)
			}
			state => Self::decided(state),
		};
		debug!("{}: {:?} (state {:?})", conflict.path.display(), resolution, self.state);
		resolution
	}

	/// Apply an answer to the current state and return the decision for this file
	pub fn apply(&mut self, choice: OverwriteChoice) -> Resolution {
		if self.state != BatchState::Ask {
			return Self::decided(self.state);
		}
		match choice {
			OverwriteChoice::Backup => Resolution::BackupAndOverwrite,
			OverwriteChoice::Overwrite => Resolution::Overwrite,
			OverwriteChoice::Skip => Resolution::Skip,
			OverwriteChoice::BackupAll => {
				self.state = BatchState::BackupAll;
				Resolution::BackupAndOverwrite
			}
			OverwriteChoice::OverwriteAll => {
				self.state = BatchState::OverwriteAll;
				Resolution::Overwrite
			}
			OverwriteChoice::SkipAll => {
				self.state = BatchState::SkipAll;
				Resolution::Skip
			}
			OverwriteChoice::Cancel => {
				self.state = BatchState::Cancelled;
				Resolution::Cancel
			}
		}
	}

	fn decided(state: BatchState) -> Resolution {
		match state {
			BatchState::BackupAll => Resolution::BackupAndOverwrite,
			BatchState::OverwriteAll => Resolution::Overwrite,
			BatchState::SkipAll => Resolution::Skip,
			BatchState::Cancelled => Resolution::Cancel,
			// Only reached from resolve(), which handles Ask itself
			BatchState::Ask => Resolution::Skip,
		}
	}
}


// vim: ts=4
