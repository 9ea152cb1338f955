//! Record <-> file mapping
//!
//! Pure translation between remote script records and workspace files. No
//! formatting happens here: code goes to disk and back byte for byte.

use crate::types::{RecordPatch, ScriptRecord};
use std::path::Path;

/// Extension given to every script file
pub const FILE_EXTENSION: &str = "ts";

/// Characters that cannot appear in a file name on common file systems
const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// File content for a record: its code body, untouched
pub fn to_file(record: &ScriptRecord) -> String {
	record.code.clone().unwrap_or_default()
}

/// File-system-safe file name for a record, with the fixed extension
pub fn file_name_for(record: &ScriptRecord) -> String {
	let stem = sanitize(&record.name);
	let stem = if stem.is_empty() { sanitize(&record.id) } else { stem };
	format!("{}.{}", stem, FILE_EXTENSION)
}

/// Record name derived from a script file path (the file stem)
pub fn record_name_for(path: &Path) -> String {
	path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Partial record for pushing `content`
///
/// Updates only carry the code; creates (no existing record) also carry the
/// name, taken from `name`.
pub fn to_update_payload(
	content: &str,
	existing: Option<&ScriptRecord>,
	name: &str,
) -> RecordPatch {
	match existing {
		Some(_) => RecordPatch { name: None, code: Some(content.to_string()) },
		None => RecordPatch { name: Some(name.to_string()), code: Some(content.to_string()) },
	}
}

/// True when a path looks like a script file
pub fn is_script_file(path: &Path) -> bool {
	path.extension().map(|e| e == FILE_EXTENSION).unwrap_or(false)
}

fn sanitize(name: &str) -> String {
	let replaced: String = name
		.chars()
		.map(|c| if UNSAFE_CHARS.contains(&c) || c.is_control() { '_' } else { c })
		.collect();
	replaced.trim().trim_matches('.').trim().to_string()
}


// vim: ts=4
