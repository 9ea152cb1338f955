//! Read-only comparisons between files and records
//!
//! Nothing here writes to the workspace, the config or the remote side.

use similar::{ChangeTag, TextDiff};
use std::path::Path;

use super::SyncSession;
use crate::error::SyncError;
use crate::transport::ScriptTransport;
use crate::types::ScriptRecord;

/// Lines of context around each hunk of the unified diff
const CONTEXT_RADIUS: usize = 3;

/// A metadata field whose value differs between two records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
	pub field: &'static str,
	pub left: Option<String>,
	pub right: Option<String>,
}

/// Outcome of a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareResult {
	/// Label of the left side (file path or record description)
	pub left: String,
	pub right: String,

	/// Code bodies are byte-identical
	pub identical: bool,

	/// Lines only on the right side
	pub insertions: usize,

	/// Lines only on the left side
	pub deletions: usize,

	/// Unified diff of the code bodies, empty when identical
	pub unified: String,

	/// Differing field lists (record-vs-record comparisons only)
	pub field_changes: Vec<FieldChange>,
}

impl CompareResult {
	/// Compare two texts
	pub fn of_texts(left: String, right: String, left_text: &str, right_text: &str) -> Self {
		let diff = TextDiff::from_lines(left_text, right_text);
		let mut insertions = 0;
		let mut deletions = 0;
		for change in diff.iter_all_changes() {
			match change.tag() {
				ChangeTag::Insert => insertions += 1,
				ChangeTag::Delete => deletions += 1,
				ChangeTag::Equal => {}
			}
		}

		let identical = left_text == right_text;
		let unified = if identical {
			String::new()
		} else {
			diff.unified_diff().context_radius(CONTEXT_RADIUS).header(&left, &right).to_string()
		};
		CompareResult {
			left,
			right,
			identical,
			insertions,
			deletions,
			unified,
			field_changes: vec![],
		}
	}
}

impl<T: ScriptTransport> SyncSession<T> {
	/// Compare a file with the record it is linked to
	pub async fn compare_local_with_linked(&self, path: &Path) -> Result<CompareResult, SyncError> {
		let rel = self.workspace.contained(path)?;
		let id = self
			.config
			.linked_id(&rel)
			.ok_or_else(|| SyncError::NotLinked { path: rel.clone() })?
			.to_string();
		self.compare_local_with_remote(path, &id).await
	}

	/// Compare a file with any record
	pub async fn compare_local_with_remote(
		&self,
		path: &Path,
		id: &str,
	) -> Result<CompareResult, SyncError> {
		let rel = self.workspace.relative(path);
		let local = self.workspace.read_to_string(Path::new(&rel)).await?;
		let record = self.compare_target(id).await?;
		Ok(CompareResult::of_texts(
			rel,
			record_label(&record),
			&local,
			record.code.as_deref().unwrap_or(""),
		))
	}

	/// Compare two workspace files
	pub async fn compare_local_files(&self, a: &Path, b: &Path) -> Result<CompareResult, SyncError> {
		let (a, b) = (self.workspace.relative(a), self.workspace.relative(b));
		let left = self.workspace.read_to_string(Path::new(&a)).await?;
		let right = self.workspace.read_to_string(Path::new(&b)).await?;
		Ok(CompareResult::of_texts(a, b, &left, &right))
	}

	/// Compare two records: code and field lists
	pub async fn compare_remote_records(&self, a: &str, b: &str) -> Result<CompareResult, SyncError> {
		let left = self.compare_target(a).await?;
		let right = self.compare_target(b).await?;
		let mut result = CompareResult::of_texts(
			record_label(&left),
			record_label(&right),
			left.code.as_deref().unwrap_or(""),
			right.code.as_deref().unwrap_or(""),
		);
		result.field_changes = field_changes(&left, &right);
		Ok(result)
	}

	async fn compare_target(&self, id: &str) -> Result<ScriptRecord, SyncError> {
		self.transport
			.retrieve(id)
			.await
			.map_err(SyncError::query)?
			.ok_or_else(|| SyncError::RemoteRecordNotFound { id: id.to_string() })
	}
}

fn record_label(record: &ScriptRecord) -> String {
	format!("{} ({}) on Salesforce", record.name, record.id)
}

fn field_changes(left: &ScriptRecord, right: &ScriptRecord) -> Vec<FieldChange> {
	let fields = [
		("SBQQ__GroupFields__c", &left.group_fields, &right.group_fields),
		("SBQQ__QuoteFields__c", &left.quote_fields, &right.quote_fields),
		("SBQQ__QuoteLineFields__c", &left.quote_line_fields, &right.quote_line_fields),
	];
	fields
		.into_iter()
		.filter(|(_, l, r)| l != r)
		.map(|(field, l, r)| FieldChange { field, left: l.clone(), right: r.clone() })
		.collect()
}


// vim: ts=4
