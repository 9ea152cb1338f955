//! Overwrite conflicts between local files and remote records

use std::path::PathBuf;

use crate::types::ScriptRecord;

pub mod resolver;

pub use resolver::{BatchState, OverwriteResolver, Resolution};

/// A write that would replace content that differs from what is being written
#[derive(Debug, Clone)]
pub struct Conflict {
	/// Local file involved (workspace-relative)
	pub path: PathBuf,

	/// Type of conflict
	pub conflict_type: ConflictType,

	/// Remote record involved
	pub record_id: String,
	pub record_name: String,

	/// "Last Modified by ... at ..." line of the remote record
	pub remote_detail: String,

	/// Content currently in the local file
	pub local: String,

	/// Code currently on the remote record
	pub remote: String,
}

/// Types of conflicts that can occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
	/// Pushing an unlinked file whose name matches an existing record
	NameMatch,

	/// Pushing a linked file whose record changed remotely since the last sync
	RemoteChanged,

	/// Pulling a record over a local file with different content
	LocalDiffers,
}

impl ConflictType {
	/// True when the remote side would be overwritten
	pub fn overwrites_remote(&self) -> bool {
		matches!(self, ConflictType::NameMatch | ConflictType::RemoteChanged)
	}
}

impl Conflict {
	pub fn new(
		path: PathBuf,
		conflict_type: ConflictType,
		record: &ScriptRecord,
		local: String,
	) -> Self {
		Conflict {
			path,
			conflict_type,
			record_id: record.id.clone(),
			record_name: record.name.clone(),
			remote_detail: record.detail(),
			local,
			remote: record.code.clone().unwrap_or_default(),
		}
	}

	/// Question shown when the user is asked what to do
	pub fn message(&self) -> String {
		match self.conflict_type {
			ConflictType::NameMatch => format!(
				"A record named \"{}\" already exists on Salesforce ({}). {}",
				self.record_name,
				self.remote_detail,
				"Do you want to overwrite it with your local file?"
			),
			ConflictType::RemoteChanged => format!(
				"Record \"{}\" was changed on Salesforce since your last sync ({}). {}",
				self.record_name,
				self.remote_detail,
				"Do you want to overwrite it with your local file?"
			),
			ConflictType::LocalDiffers => format!(
				"{} differs from the record on Salesforce ({}). {}",
				self.path.display(),
				self.remote_detail,
				"Do you want to overwrite your local file?"
			),
		}
	}

	/// Content that would be replaced by the write
	pub fn replaced_content(&self) -> &str {
		if self.conflict_type.overwrites_remote() {
			&self.remote
		} else {
			&self.local
		}
	}
}


// vim: ts=4
