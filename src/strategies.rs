//! Overwrite policy and choice enums
//!
//! Both enums implement `FromStr` for CLI and settings parsing, and `Display`
//! with the same spelling so values round-trip through the settings file.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// OVERWRITE POLICY
// ============================================================================

/// What a batch does when a write would replace content that differs
///
/// This is the initial state of a batch's overwrite resolver; `Ask` consults
/// the presentation layer, the others decide every file the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
	/// Prompt per file (default)
	#[default]
	Ask,

	/// Replace without asking
	Overwrite,

	/// Keep the existing content
	Skip,

	/// Save a copy of the existing content, then replace it
	Backup,
}

impl FromStr for OverwritePolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"ask" | "prompt" | "interactive" => Ok(Self::Ask),
			"overwrite" | "force" => Ok(Self::Overwrite),
			"skip" | "keep" => Ok(Self::Skip),
			"backup" => Ok(Self::Backup),
			_ => Err(format!(
				"Unknown overwrite policy: {}. Valid options: ask, overwrite, skip, backup",
				s
			)),
		}
	}
}

impl std::fmt::Display for OverwritePolicy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Ask => write!(f, "ask"),
			Self::Overwrite => write!(f, "overwrite"),
			Self::Skip => write!(f, "skip"),
			Self::Backup => write!(f, "backup"),
		}
	}
}

// ============================================================================
// OVERWRITE CHOICE
// ============================================================================

/// Answer to a single overwrite prompt
///
/// The `*All` variants decide the current file and every later file of the
/// batch. `Cancel` stops the batch: the current file and the rest are left
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwriteChoice {
	Backup,
	Overwrite,
	Skip,
	BackupAll,
	OverwriteAll,
	SkipAll,
	Cancel,
}

impl OverwriteChoice {
	/// Every choice, in prompt order
	pub const ALL: [OverwriteChoice; 7] = [
		OverwriteChoice::Backup,
		OverwriteChoice::Overwrite,
		OverwriteChoice::Skip,
		OverwriteChoice::BackupAll,
		OverwriteChoice::OverwriteAll,
		OverwriteChoice::SkipAll,
		OverwriteChoice::Cancel,
	];

	/// Single-key shortcut shown by the CLI prompt
	pub fn shortcut(&self) -> char {
		match self {
			Self::Backup => 'b',
			Self::Overwrite => 'o',
			Self::Skip => 's',
			Self::BackupAll => 'B',
			Self::OverwriteAll => 'O',
			Self::SkipAll => 'S',
			Self::Cancel => 'c',
		}
	}

	/// Prompt label
	pub fn label(&self) -> &'static str {
		match self {
			Self::Backup => "Backup and Overwrite",
			Self::Overwrite => "Overwrite",
			Self::Skip => "Skip",
			Self::BackupAll => "Backup and Overwrite All",
			Self::OverwriteAll => "Overwrite All",
			Self::SkipAll => "Skip All",
			Self::Cancel => "Cancel",
		}
	}
}

impl FromStr for OverwriteChoice {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		// Shortcuts are case sensitive: lowercase is this file, uppercase is all
		if s.chars().count() == 1 {
			if let Some(choice) = Self::ALL.iter().find(|c| s.starts_with(c.shortcut())) {
				return Ok(*choice);
			}
		}
		match s.to_lowercase().as_str() {
			"backup" => Ok(Self::Backup),
			"overwrite" => Ok(Self::Overwrite),
			"skip" => Ok(Self::Skip),
			"backup-all" | "backup all" => Ok(Self::BackupAll),
			"overwrite-all" | "overwrite all" => Ok(Self::OverwriteAll),
			"skip-all" | "skip all" => Ok(Self::SkipAll),
			"cancel" => Ok(Self::Cancel),
			_ => Err(format!("Unknown choice: {}", s)),
		}
	}
}

impl std::fmt::Display for OverwriteChoice {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Backup => write!(f, "backup"),
			Self::Overwrite => write!(f, "overwrite"),
			Self::Skip => write!(f, "skip"),
			Self::BackupAll => write!(f, "backup-all"),
			Self::OverwriteAll => write!(f, "overwrite-all"),
			Self::SkipAll => write!(f, "skip-all"),
			Self::Cancel => write!(f, "cancel"),
		}
	}
}


// vim: ts=4
