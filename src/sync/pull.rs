//! Pull engine: remote records to local files

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::backup::LOCAL_PREFIX;
use super::report::{BatchReport, ItemReport, ItemStatus};
use super::SyncSession;
use crate::activity::Action;
use crate::callbacks::{ProgressEvent, SyncCallbacks};
use crate::conflict::{Conflict, ConflictType, OverwriteResolver, Resolution};
use crate::error::SyncError;
use crate::logging::*;
use crate::mapper;
use crate::strategies::OverwritePolicy;
use crate::transport::{ScriptQuery, ScriptTransport};
use crate::types::{LocalFileEntry, Lookup, ScriptRecord};
use crate::utils::CancelToken;

/// What to pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullTarget {
	/// A workspace file: its linked record, or the record named after it
	File(PathBuf),

	/// A record picked by id (e.g. from `list_remote`)
	RecordId(String),

	/// The record carrying this name
	Name(String),
}

/// Result of pulling one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
	/// The file now holds the record's code (`written` is false when it already did)
	Pulled { record_id: String, path: String, written: bool },

	/// The local file was kept
	Skipped { record_id: String, path: String },

	/// The batch was cancelled at this file
	Cancelled,
}

impl PullOutcome {
	/// Batch status of this outcome
	pub fn status(&self) -> ItemStatus {
		match self {
			PullOutcome::Pulled { .. } => ItemStatus::Succeeded,
			PullOutcome::Skipped { .. } => ItemStatus::SkippedByPolicy,
			PullOutcome::Cancelled => ItemStatus::NotAttempted,
		}
	}
}

impl<T: ScriptTransport> SyncSession<T> {
	/// Pull every remote record into the source directory
	///
	/// A failing query aborts before any file is touched. After that, items
	/// fail independently; files written before a failure stay on disk. The
	/// config is saved once, after the loop.
	pub async fn pull_all(
		&mut self,
		policy: OverwritePolicy,
		cancel: &CancelToken,
		callbacks: &dyn SyncCallbacks,
	) -> Result<BatchReport, SyncError> {
		let records = self
			.transport
			.query(&ScriptQuery::All { with_code: true })
			.await
			.map_err(SyncError::query)?
			.records;

		let targets: Vec<String> = records.iter().map(|r| self.target_path(r)).collect();
		let mut ids_by_name: HashMap<&str, Vec<String>> = HashMap::new();
		let mut ids_by_target: HashMap<&str, Vec<String>> = HashMap::new();
		for (record, target) in records.iter().zip(&targets) {
			ids_by_name.entry(record.name.as_str()).or_default().push(record.id.clone());
			ids_by_target.entry(target.as_str()).or_default().push(record.id.clone());
		}

		let before = self.config.clone();
		let mut resolver = OverwriteResolver::new(policy);
		let mut report = BatchReport::new();
		let total = records.len();

		for (index, (record, item)) in records.iter().zip(&targets).enumerate() {
			let item = item.clone();
			if cancel.is_cancelled() || resolver.is_cancelled() {
				report.push(ItemReport::new(item, Some(record.id.clone()), ItemStatus::NotAttempted));
				continue;
			}
			callbacks.on_progress(ProgressEvent {
				completed: index,
				total,
				current_item: item.clone(),
			});

			let same_name = &ids_by_name[record.name.as_str()];
			let same_file = &ids_by_target[item.as_str()];
			let result = if same_name.len() > 1 {
				Err(SyncError::AmbiguousName { name: record.name.clone(), ids: same_name.clone() })
			} else if same_file.len() > 1 {
				Err(SyncError::FileClash { path: item.clone(), ids: same_file.clone() })
			} else {
				self.write_record(&item, record, &mut resolver, callbacks).await
			};

			let status = match result {
				Ok(ref outcome) => outcome.status(),
				Err(e) => {
					callbacks.on_error(&item, &e);
					ItemStatus::Failed(e)
				}
			};
			let item_report = ItemReport::new(item, Some(record.id.clone()), status);
			callbacks.on_item(&item_report);
			report.push(item_report);
		}

		if self.config != before {
			self.persist().await?;
		}
		info!("Pull finished: {}", report.summary());
		self.log_activity(Action::Pull, &report).await;
		Ok(report)
	}

	/// Pull a single record
	pub async fn pull_one(
		&mut self,
		target: PullTarget,
		policy: OverwritePolicy,
		callbacks: &dyn SyncCallbacks,
	) -> Result<PullOutcome, SyncError> {
		let (record, path) = match target {
			PullTarget::File(path) => {
				let rel = self.workspace.contained(&path)?;
				let record = match self.config.linked_id(&rel).map(str::to_string) {
					Some(id) => self.retrieve_record(&id).await?,
					None => self.record_named(&mapper::record_name_for(&path)).await?,
				};
				(record, rel)
			}
			PullTarget::RecordId(id) => {
				let record = self.retrieve_record(&id).await?;
				let path = self.target_path(&record);
				(record, path)
			}
			PullTarget::Name(name) => {
				let record = self.record_named(&name).await?;
				let path = self.target_path(&record);
				(record, path)
			}
		};

		let mut resolver = OverwriteResolver::new(policy);
		let before = self.config.clone();
		let outcome = self.write_record(&path, &record, &mut resolver, callbacks).await;

		if self.config != before {
			self.persist().await?;
		}
		let logged = match &outcome {
			Ok(PullOutcome::Cancelled) => None,
			Ok(done) => Some(done.status().to_string()),
			Err(e) => Some(ItemStatus::failure_text(e)),
		};
		if let Some(text) = logged {
			self.log_activity_item(Action::Pull, &path, Some(&record.id), text).await;
		}
		outcome
	}

	/// Write a record's code to `path` and link the two
	async fn write_record(
		&mut self,
		path: &str,
		record: &ScriptRecord,
		resolver: &mut OverwriteResolver,
		callbacks: &dyn SyncCallbacks,
	) -> Result<PullOutcome, SyncError> {
		let content = mapper::to_file(record);
		let file = Path::new(path);
		let file_name = file
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_else(|| mapper::file_name_for(record));

		let mut written = true;
		if self.workspace.exists(file).await {
			let local = self.workspace.read_to_string(file).await?;
			if local == content {
				written = false;
			} else {
				let conflict =
					Conflict::new(file.to_path_buf(), ConflictType::LocalDiffers, record, local);
				match resolver.resolve(&conflict, callbacks) {
					Resolution::Overwrite => {}
					Resolution::BackupAndOverwrite => {
						self.backup_before_overwrite(resolver, LOCAL_PREFIX, &file_name, &conflict.local)
							.await?;
					}
					Resolution::Skip => {
						info!("Skipped {}", path);
						return Ok(PullOutcome::Skipped {
							record_id: record.id.clone(),
							path: path.to_string(),
						});
					}
					Resolution::Cancel => return Ok(PullOutcome::Cancelled),
				}
			}
		}

		if written {
			self.workspace.write(file, &content).await?;
			info!("Pulled {} into {}", record.name, path);
		} else {
			debug!("{} already matches {}", path, record.name);
		}
		self.config.link(LocalFileEntry::linked(&file_name, path, record));
		Ok(PullOutcome::Pulled { record_id: record.id.clone(), path: path.to_string(), written })
	}

	/// File a record is pulled into: its linked file, or one named after it
	fn target_path(&self, record: &ScriptRecord) -> String {
		match self.config.entry_for_record(&record.id) {
			Some(entry) => entry.file_path.clone(),
			None => self.workspace.source_file_path(&mapper::file_name_for(record)),
		}
	}

	/// Fetch a record by id, with code
	pub(crate) async fn retrieve_record(&self, id: &str) -> Result<ScriptRecord, SyncError> {
		self.transport
			.retrieve(id)
			.await
			.map_err(SyncError::query)?
			.ok_or_else(|| SyncError::RecordNotFound { id: id.to_string() })
	}

	async fn record_named(&self, name: &str) -> Result<ScriptRecord, SyncError> {
		match self.lookup_by_name(name, true).await? {
			Lookup::Found(record) => Ok(record),
			Lookup::NotFound => Err(SyncError::NoRecordNamed { name: name.to_string() }),
			Lookup::Ambiguous(ids) => Err(SyncError::AmbiguousName { name: name.to_string(), ids }),
		}
	}
}


// vim: ts=4
