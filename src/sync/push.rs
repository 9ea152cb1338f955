//! Push engine: local files to remote records

use std::path::{Path, PathBuf};

use super::backup::REMOTE_PREFIX;
use super::report::{BatchReport, ItemReport, ItemStatus};
use super::SyncSession;
use crate::activity::Action;
use crate::callbacks::{ProgressEvent, SyncCallbacks};
use crate::conflict::{Conflict, ConflictType, OverwriteResolver, Resolution};
use crate::error::SyncError;
use crate::logging::*;
use crate::mapper;
use crate::strategies::OverwritePolicy;
use crate::transport::ScriptTransport;
use crate::types::{LocalFileEntry, Lookup, ScriptRecord};
use crate::utils::CancelToken;

/// Result of pushing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
	/// The record now holds the file's content
	Pushed { record_id: String, created: bool },

	/// The remote record was kept
	Skipped { record_id: String },

	/// The batch was cancelled at this file
	Cancelled,
}

impl<T: ScriptTransport> SyncSession<T> {
	/// Push one file
	///
	/// Linked files update their record. Unlinked files are matched by name:
	/// no match creates a record, one match goes through `resolver`, several
	/// matches fail with `AmbiguousName`. The config is saved before returning.
	pub async fn push_one(
		&mut self,
		path: &Path,
		resolver: &mut OverwriteResolver,
		callbacks: &dyn SyncCallbacks,
	) -> Result<PushOutcome, SyncError> {
		let rel = self.workspace.contained(path)?;
		let file = PathBuf::from(&rel);
		let content = self.workspace.read_to_string(&file).await?;
		let file_name =
			file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

		let (record_id, created) = match self.config.entry_for_path(&rel).cloned() {
			Some(LocalFileEntry { linked_record_id: Some(id), remote_modified_date, .. }) => {
				let record = self.retrieve_record(&id).await?;
				let code = record.code.as_deref().unwrap_or("");
				let changed_remotely = remote_modified_date.is_some()
					&& remote_modified_date != record.last_modified_date
					&& code != content;
				if changed_remotely {
					warn!("{} changed on Salesforce since it was last synced", record.name);
					let conflict =
						Conflict::new(file.clone(), ConflictType::RemoteChanged, &record, content.clone());
					if let Some(outcome) =
						self.settle(&conflict, &file_name, resolver, callbacks).await?
					{
						return Ok(outcome);
					}
				}
				self.update_record(&record, &content).await?;
				(id, false)
			}
			_ => {
				let name = mapper::record_name_for(&file);
				match self.lookup_by_name(&name, true).await? {
					Lookup::NotFound => {
						let patch = mapper::to_update_payload(&content, None, &name);
						let id = self
							.transport
							.create(&patch)
							.await
							.map_err(|e| SyncError::write(None, e))?;
						info!("Created record {} ({})", name, id);
						(id, true)
					}
					Lookup::Found(record) => {
						if record.code.as_deref().unwrap_or("") != content {
							let conflict =
								Conflict::new(file.clone(), ConflictType::NameMatch, &record, content.clone());
							if let Some(outcome) =
								self.settle(&conflict, &file_name, resolver, callbacks).await?
							{
								return Ok(outcome);
							}
							self.update_record(&record, &content).await?;
						}
						(record.id, false)
					}
					Lookup::Ambiguous(ids) => return Err(SyncError::AmbiguousName { name, ids }),
				}
			}
		};

		// Re-read to stamp the modification date our own write produced
		let modified = match self.transport.retrieve(&record_id).await {
			Ok(Some(record)) => record.last_modified_date,
			Ok(None) | Err(_) => {
				warn!("Could not re-read {} after pushing, remote change detection disabled for it", record_id);
				None
			}
		};
		self.config.link(LocalFileEntry {
			file_name,
			file_path: rel.clone(),
			linked_record_id: Some(record_id.clone()),
			remote_modified_date: modified,
		});
		self.persist().await?;
		info!("Pushed {}", rel);
		Ok(PushOutcome::Pushed { record_id, created })
	}

	/// Push files in order, continuing past failures
	pub async fn push_all(
		&mut self,
		paths: &[PathBuf],
		policy: OverwritePolicy,
		cancel: &CancelToken,
		callbacks: &dyn SyncCallbacks,
	) -> BatchReport {
		let mut resolver = OverwriteResolver::new(policy);
		let mut report = BatchReport::new();
		let total = paths.len();

		for (index, path) in paths.iter().enumerate() {
			let item = self.workspace.relative(path);
			let linked = self.config.linked_id(&item).map(str::to_string);
			if cancel.is_cancelled() || resolver.is_cancelled() {
				report.push(ItemReport::new(item, linked, ItemStatus::NotAttempted));
				continue;
			}
			callbacks.on_progress(ProgressEvent { completed: index, total, current_item: item.clone() });

			let (status, record_id) = match self.push_one(path, &mut resolver, callbacks).await {
				Ok(PushOutcome::Pushed { record_id, .. }) => (ItemStatus::Succeeded, Some(record_id)),
				Ok(PushOutcome::Skipped { record_id }) => {
					(ItemStatus::SkippedByPolicy, Some(record_id))
				}
				Ok(PushOutcome::Cancelled) => (ItemStatus::NotAttempted, linked),
				Err(e) => {
					warn!("Failed to push {}: {}", item, e);
					callbacks.on_error(&item, &e);
					(ItemStatus::Failed(e), linked)
				}
			};
			let item_report = ItemReport::new(item, record_id, status);
			callbacks.on_item(&item_report);
			report.push(item_report);
		}

		info!("Push finished: {}", report.summary());
		self.log_activity(Action::Push, &report).await;
		report
	}

	/// Push every script file of the source directory
	pub async fn push_workspace(
		&mut self,
		policy: OverwritePolicy,
		cancel: &CancelToken,
		callbacks: &dyn SyncCallbacks,
	) -> Result<BatchReport, SyncError> {
		let files = self.workspace.source_files().await?;
		Ok(self.push_all(&files, policy, cancel, callbacks).await)
	}

	/// Decide a push conflict; `Some` ends the push of this file
	async fn settle(
		&self,
		conflict: &Conflict,
		file_name: &str,
		resolver: &mut OverwriteResolver,
		callbacks: &dyn SyncCallbacks,
	) -> Result<Option<PushOutcome>, SyncError> {
		match resolver.resolve(conflict, callbacks) {
			Resolution::Overwrite => Ok(None),
			Resolution::BackupAndOverwrite => {
				self.backup_before_overwrite(resolver, REMOTE_PREFIX, file_name, &conflict.remote)
					.await?;
				Ok(None)
			}
			Resolution::Skip => {
				info!("Skipped {}", conflict.path.display());
				Ok(Some(PushOutcome::Skipped { record_id: conflict.record_id.clone() }))
			}
			Resolution::Cancel => Ok(Some(PushOutcome::Cancelled)),
		}
	}

	async fn update_record(&self, record: &ScriptRecord, content: &str) -> Result<(), SyncError> {
		let patch = mapper::to_update_payload(content, Some(record), &record.name);
		self.transport
			.update(&record.id, &patch)
			.await
			.map_err(|e| SyncError::write(Some(&record.id), e))?;
		debug!("Updated record {} ({})", record.name, record.id);
		Ok(())
	}
}


// vim: ts=4
