//! Batch outcome reporting

use std::fmt;

use crate::error::SyncError;

/// Outcome of one batch item
#[derive(Debug)]
pub enum ItemStatus {
	Succeeded,
	Failed(SyncError),

	/// The overwrite policy (or the user) chose to keep the existing content
	SkippedByPolicy,

	/// The batch was cancelled before this item
	NotAttempted,
}

impl ItemStatus {
	pub fn is_success(&self) -> bool {
		matches!(self, ItemStatus::Succeeded)
	}

	pub fn error(&self) -> Option<&SyncError> {
		match self {
			ItemStatus::Failed(e) => Some(e),
			_ => None,
		}
	}

	/// Text of a failed status, for callers that keep the error itself
	pub fn failure_text(error: &SyncError) -> String {
		format!("failed: {}", error)
	}
}

impl fmt::Display for ItemStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ItemStatus::Succeeded => write!(f, "succeeded"),
			ItemStatus::Failed(e) => f.write_str(&Self::failure_text(e)),
			ItemStatus::SkippedByPolicy => write!(f, "skipped"),
			ItemStatus::NotAttempted => write!(f, "not attempted"),
		}
	}
}

/// One item of a batch
#[derive(Debug)]
pub struct ItemReport {
	/// Workspace-relative file path (or record name when there is no file)
	pub item: String,

	pub record_id: Option<String>,

	pub status: ItemStatus,
}

impl ItemReport {
	pub fn new(item: impl Into<String>, record_id: Option<String>, status: ItemStatus) -> Self {
		ItemReport { item: item.into(), record_id, status }
	}
}

/// Per-item outcomes of a batch, in processing order
#[derive(Debug, Default)]
pub struct BatchReport {
	pub items: Vec<ItemReport>,
}

impl BatchReport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, item: ItemReport) {
		self.items.push(item);
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn succeeded(&self) -> usize {
		self.count(|s| matches!(s, ItemStatus::Succeeded))
	}

	pub fn failed(&self) -> usize {
		self.count(|s| matches!(s, ItemStatus::Failed(_)))
	}

	pub fn skipped(&self) -> usize {
		self.count(|s| matches!(s, ItemStatus::SkippedByPolicy))
	}

	pub fn not_attempted(&self) -> usize {
		self.count(|s| matches!(s, ItemStatus::NotAttempted))
	}

	/// True when no item failed
	pub fn is_success(&self) -> bool {
		self.failed() == 0
	}

	/// Failed items with their errors
	pub fn failures(&self) -> impl Iterator<Item = (&str, &SyncError)> {
		self.items.iter().filter_map(|i| i.status.error().map(|e| (i.item.as_str(), e)))
	}

	/// Status of the first item named `item`
	pub fn status_of(&self, item: &str) -> Option<&ItemStatus> {
		self.items.iter().find(|i| i.item == item).map(|i| &i.status)
	}

	/// e.g. `4 succeeded, 1 failed, 0 skipped, 2 not attempted`
	pub fn summary(&self) -> String {
		format!(
			"{} succeeded, {} failed, {} skipped, {} not attempted",
			self.succeeded(),
			self.failed(),
			self.skipped(),
			self.not_attempted()
		)
	}

	fn count(&self, pred: impl Fn(&ItemStatus) -> bool) -> usize {
		self.items.iter().filter(|i| pred(&i.status)).count()
	}
}


// vim: ts=4
