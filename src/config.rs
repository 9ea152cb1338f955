//! Sync config: org connection and file <-> record links
//!
//! The config is the single source of truth for which workspace file belongs
//! to which remote record. It lives in `.qcp/qcp-config.json`, is loaded once
//! per session, mutated in memory and written back after every successful
//! pull or push.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::logging::*;
use crate::types::{LocalFileEntry, OrgInfo};
use crate::workspace::Workspace;

/// Persisted config document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
	pub org_info: OrgInfo,
	pub files: Vec<LocalFileEntry>,
}

impl SyncConfig {
	/// Entry for a workspace-relative file path
	pub fn entry_for_path(&self, file_path: &str) -> Option<&LocalFileEntry> {
		self.files.iter().find(|f| f.file_path == file_path)
	}

	/// Entry linked to a record id
	pub fn entry_for_record(&self, id: &str) -> Option<&LocalFileEntry> {
		self.files.iter().find(|f| f.linked_record_id.as_deref() == Some(id))
	}

	/// Linked record id of a file, if any
	pub fn linked_id(&self, file_path: &str) -> Option<&str> {
		self.entry_for_path(file_path).and_then(|e| e.linked_record_id.as_deref())
	}

	/// Create or update the entry for `entry.file_path`
	///
	/// A record is linked to at most one file: other entries pointing at the
	/// same record id are unlinked. Returns true if anything changed.
	pub fn link(&mut self, entry: LocalFileEntry) -> bool {
		let mut changed = false;
		if let Some(ref id) = entry.linked_record_id {
			for other in self.files.iter_mut() {
				if other.file_path != entry.file_path
					&& other.linked_record_id.as_deref() == Some(id.as_str())
				{
					debug!("Unlinking {} from {}", other.file_path, id);
					other.linked_record_id = None;
					other.remote_modified_date = None;
					changed = true;
				}
			}
		}

		match self.files.iter_mut().find(|f| f.file_path == entry.file_path) {
			Some(existing) if *existing == entry => changed,
			Some(existing) => {
				*existing = entry;
				true
			}
			None => {
				self.files.push(entry);
				true
			}
		}
	}

	/// Remove the link of a file, keeping its entry; returns true if it was linked
	pub fn unlink(&mut self, file_path: &str) -> bool {
		match self.files.iter_mut().find(|f| f.file_path == file_path) {
			Some(entry) if entry.is_linked() => {
				entry.linked_record_id = None;
				entry.remote_modified_date = None;
				true
			}
			_ => false,
		}
	}
}

/// Loads and saves the config document of a workspace
#[derive(Debug, Clone)]
pub struct ConfigStore {
	workspace: Workspace,
}

impl ConfigStore {
	pub fn new(workspace: Workspace) -> Self {
		ConfigStore { workspace }
	}

	pub async fn exists(&self) -> bool {
		self.workspace.exists(&self.workspace.config_path()).await
	}

	/// Load the config; a missing file is an error
	pub async fn load(&self) -> Result<SyncConfig, SyncError> {
		let path = self.workspace.config_path();
		let config: SyncConfig = self.workspace.read_json(&path).await?;
		debug!("Loaded config with {} file entries", config.files.len());
		Ok(config)
	}

	/// Load the config, or start from defaults if the workspace has none yet
	pub async fn load_or_default(&self) -> Result<SyncConfig, SyncError> {
		if self.exists().await {
			self.load().await
		} else {
			Ok(SyncConfig::default())
		}
	}

	/// Persist the config, keeping the previous version as a backup copy
	pub async fn save(&self, config: &SyncConfig) -> Result<(), SyncError> {
		let path = self.workspace.config_path();
		if self.exists().await {
			let backup = self.workspace.config_backup_path();
			self.workspace
				.copy(&path, &backup)
				.await
				.map_err(|e| SyncError::persistence(&backup, e.to_string()))?;
		}
		self.workspace.write_json(&path, config).await?;
		debug!("Saved config with {} file entries", config.files.len());
		Ok(())
	}
}


// vim: ts=4
