//! Timestamped backups of local files and remote records
//!
//! Every backup lands in its own directory under `.qcp/backups`, named
//! `local-<timestamp>` or `remote-<timestamp>`. Directory creation is atomic,
//! so two backups taken in the same second get `-1`, `-2`... suffixes instead
//! of sharing a directory.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::report::{BatchReport, ItemReport, ItemStatus};
use super::SyncSession;
use crate::activity::Action;
use crate::conflict::OverwriteResolver;
use crate::error::SyncError;
use crate::logging::*;
use crate::mapper;
use crate::transport::{ScriptQuery, ScriptTransport};
use crate::workspace::Workspace;

/// Backup directory prefix for copies of local files
pub const LOCAL_PREFIX: &str = "local";

/// Backup directory prefix for copies of remote records
pub const REMOTE_PREFIX: &str = "remote";

/// Result of a backup run
#[derive(Debug)]
pub struct BackupReport {
	/// Directory holding the copies
	pub dir: PathBuf,

	/// One item per file copied (or failed)
	pub report: BatchReport,
}

impl<T: ScriptTransport> SyncSession<T> {
	/// Copy every file of the source directory into a new `local-<timestamp>` directory
	pub async fn backup_local(&self) -> Result<BackupReport, SyncError> {
		let files = self.workspace.list_files(&self.workspace.source_dir(), "*").await?;
		let dir = create_unique_dir(&self.workspace, LOCAL_PREFIX).await?;
		info!("Backing up {} local file(s) to {}", files.len(), dir.display());

		let mut report = BatchReport::new();
		for file in files {
			let rel = self.workspace.relative(&file);
			let status = match file.file_name() {
				Some(name) => match self.workspace.copy(&file, &dir.join(name)).await {
					Ok(()) => ItemStatus::Succeeded,
					Err(e) => ItemStatus::Failed(e),
				},
				None => continue,
			};
			let record_id = self.config.linked_id(&rel).map(str::to_string);
			report.push(ItemReport::new(rel, record_id, status));
		}

		self.log_activity(Action::BackupLocal, &report).await;
		Ok(BackupReport { dir, report })
	}

	/// Write the code of every remote record into a new `remote-<timestamp>` directory
	pub async fn backup_remote(&self) -> Result<BackupReport, SyncError> {
		let records = self
			.transport
			.query(&ScriptQuery::All { with_code: true })
			.await
			.map_err(SyncError::query)?
			.records;
		let dir = create_unique_dir(&self.workspace, REMOTE_PREFIX).await?;
		info!("Backing up {} remote record(s) to {}", records.len(), dir.display());

		let mut used = HashSet::new();
		let mut report = BatchReport::new();
		for record in &records {
			let file_name = unique_file_name(&mut used, &mapper::file_name_for(record));
			let path = dir.join(&file_name);
			let status = match self.workspace.write(&path, &mapper::to_file(record)).await {
				Ok(()) => ItemStatus::Succeeded,
				Err(e) => ItemStatus::Failed(e),
			};
			report.push(ItemReport::new(file_name, Some(record.id.clone()), status));
		}

		self.log_activity(Action::BackupRemote, &report).await;
		Ok(BackupReport { dir, report })
	}

	/// Save content about to be overwritten into the batch's backup directory
	pub(crate) async fn backup_before_overwrite(
		&self,
		resolver: &mut OverwriteResolver,
		prefix: &str,
		file_name: &str,
		content: &str,
	) -> Result<PathBuf, SyncError> {
		let dir = match resolver.backup_dir() {
			Some(dir) => dir.to_path_buf(),
			None => {
				let dir = create_unique_dir(&self.workspace, prefix).await?;
				resolver.set_backup_dir(dir.clone());
				dir
			}
		};
		let path = dir.join(file_name);
		self.workspace.write(&path, content).await?;
		info!("Backed up {} to {}", file_name, path.display());
		Ok(path)
	}
}

/// Create `<backups>/<prefix>-<timestamp>[-N]`, never reusing an existing directory
pub async fn create_unique_dir(workspace: &Workspace, prefix: &str) -> Result<PathBuf, SyncError> {
	let parent = workspace.backups_dir();
	tokio::fs::create_dir_all(&parent).await?;

	let stamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
	let base = format!("{}-{}", prefix, stamp);
	let mut suffix = 0;
	loop {
		let name = if suffix == 0 { base.clone() } else { format!("{}-{}", base, suffix) };
		let dir = parent.join(&name);
		match tokio::fs::create_dir(&dir).await {
			Ok(()) => return Ok(dir),
			Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
			Err(e) => return Err(e.into()),
		}
	}
}

/// `name`, or `stem-N.ext` for the N-th repeat within one backup
fn unique_file_name(used: &mut HashSet<String>, name: &str) -> String {
	if used.insert(name.to_string()) {
		return name.to_string();
	}
	let path = Path::new(name);
	let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
	let ext = path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
	let mut n = 1;
	loop {
		let candidate = format!("{}-{}{}", stem, n, ext);
		if used.insert(candidate.clone()) {
			return candidate;
		}
		n += 1;
	}
}


// vim: ts=4
