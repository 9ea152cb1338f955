//! Activity log of push, pull and backup results
//!
//! Kept in `.qcp/qcp-log.json` as a JSON array, newest entry last, capped at
//! `maxLogEntries`. The previous log is copied to `.qcp/qcp-log.bak.json`
//! before every write.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::logging::*;
use crate::settings::Settings;
use crate::sync::report::{BatchReport, ItemStatus};
use crate::workspace::Workspace;

/// Operation that produced a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
	Pull,
	Push,
	BackupLocal,
	BackupRemote,
}

impl std::fmt::Display for Action {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Action::Pull => write!(f, "pull"),
			Action::Push => write!(f, "push"),
			Action::BackupLocal => write!(f, "backup-local"),
			Action::BackupRemote => write!(f, "backup-remote"),
		}
	}
}

/// One logged item result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
	/// UTC, RFC 3339
	pub timestamp: String,
	pub action: Action,
	pub file: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub record_id: Option<String>,
	pub outcome: String,
}

/// Appends batch results to the workspace activity log
#[derive(Debug, Clone)]
pub struct ActivityLog {
	workspace: Workspace,
	enabled: bool,
	max_entries: usize,
}

impl ActivityLog {
	pub fn new(workspace: Workspace, settings: &Settings) -> Self {
		ActivityLog { workspace, enabled: settings.save_log, max_entries: settings.max_log_entries }
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Entries currently in the log, oldest first
	pub async fn entries(&self) -> Result<Vec<ActivityEntry>, SyncError> {
		let path = self.workspace.log_path();
		if !self.workspace.exists(&path).await {
			return Ok(vec![]);
		}
		self.workspace.read_json(&path).await
	}

	/// Append every attempted item of `report`
	pub async fn record(&self, action: Action, report: &BatchReport) -> Result<(), SyncError> {
		let timestamp = now();
		let entries = report
			.items
			.iter()
			.filter(|i| !matches!(i.status, ItemStatus::NotAttempted))
			.map(|i| ActivityEntry {
				timestamp: timestamp.clone(),
				action,
				file: i.item.clone(),
				record_id: i.record_id.clone(),
				outcome: i.status.to_string(),
			})
			.collect();
		self.append(entries).await
	}

	/// Append a single item whose outcome is already rendered
	pub async fn record_item(
		&self,
		action: Action,
		file: &str,
		record_id: Option<&str>,
		outcome: String,
	) -> Result<(), SyncError> {
		let entry = ActivityEntry {
			timestamp: now(),
			action,
			file: file.to_string(),
			record_id: record_id.map(str::to_string),
			outcome,
		};
		self.append(vec![entry]).await
	}

	async fn append(&self, new_entries: Vec<ActivityEntry>) -> Result<(), SyncError> {
		if !self.enabled || new_entries.is_empty() {
			return Ok(());
		}

		let mut entries = self.entries().await?;
		entries.extend(new_entries);
		if entries.len() > self.max_entries {
			let excess = entries.len() - self.max_entries;
			entries.drain(..excess);
		}

		let path = self.workspace.log_path();
		if self.workspace.exists(&path).await {
			let backup = self.workspace.log_backup_path();
			self.workspace
				.copy(&path, &backup)
				.await
				.map_err(|e| SyncError::persistence(&backup, e.to_string()))?;
		}
		self.workspace.write_json(&path, &entries).await?;
		debug!("Activity log now holds {} entries", entries.len());
		Ok(())
	}
}

fn now() -> String {
	chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sync::report::ItemReport;
	use tempfile::TempDir;

	fn report(items: &[&str]) -> BatchReport {
		let mut report = BatchReport::new();
		for item in items {
			report.push(ItemReport::new(*item, None, ItemStatus::Succeeded));
		}
		report
	}

	#[tokio::test]
	async fn test_log_is_capped() {
		let dir = TempDir::new().unwrap();
		let settings = Settings { max_log_entries: 3, ..Default::default() };
		let log = ActivityLog::new(Workspace::new(dir.path(), "src"), &settings);

		log.record(Action::Push, &report(&["a", "b"])).await.unwrap();
		log.record(Action::Pull, &report(&["c", "d"])).await.unwrap();

		let entries = log.entries().await.unwrap();
		let files: Vec<&str> = entries.iter().map(|e| e.file.as_str()).collect();
		assert_eq!(files, vec!["b", "c", "d"]);
		assert_eq!(entries[2].action, Action::Pull);
		assert_eq!(entries[2].outcome, "succeeded");
	}

	#[tokio::test]
	async fn test_not_attempted_items_and_disabled_log() {
		let dir = TempDir::new().unwrap();
		let ws = Workspace::new(dir.path(), "src");
		let mut batch = BatchReport::new();
		batch.push(ItemReport::new("a", None, ItemStatus::NotAttempted));

		let log = ActivityLog::new(ws.clone(), &Settings::default());
		log.record(Action::Push, &batch).await.unwrap();
		assert!(!ws.exists(&ws.log_path()).await);

		let off = ActivityLog::new(ws.clone(), &Settings { save_log: false, ..Default::default() });
		off.record(Action::Push, &report(&["a"])).await.unwrap();
		assert!(!ws.exists(&ws.log_path()).await);
	}

	#[tokio::test]
	async fn test_record_single_item() {
		let dir = TempDir::new().unwrap();
		let log = ActivityLog::new(Workspace::new(dir.path(), "src"), &Settings::default());
		let error = SyncError::RecordNotFound { id: "a1".into() };

		log.record_item(Action::Pull, "src/A.ts", Some("a1"), ItemStatus::failure_text(&error))
			.await
			.unwrap();

		let entries = log.entries().await.unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].record_id.as_deref(), Some("a1"));
		assert_eq!(entries[0].outcome, "failed: Linked record a1 no longer exists on Salesforce");
	}
}

// vim: ts=4
