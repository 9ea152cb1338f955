//! Tool settings
//!
//! Settings follow a priority chain:
//! 1. Built-in defaults (`Settings::default()`)
//! 2. Settings file (`.qcp/settings.toml`)
//! 3. Environment variables (`QCPSYNC_*` prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SyncError;
use crate::strategies::OverwritePolicy;
use crate::workspace::{SETTINGS_FILE, STATE_DIR};

/// Prefix of the environment variables read by [`Settings::apply_env`]
pub const ENV_PREFIX: &str = "QCPSYNC_";

/// Behavior settings of a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
	// ========================================================================
	// WORKSPACE
	// ========================================================================
	/// Directory holding script files, relative to the workspace root
	pub source_dir: String,

	// ========================================================================
	// SYNC BEHAVIOR
	// ========================================================================
	/// Treat saved source files as push candidates
	///
	/// Read by [`SyncSession::on_file_saved`](crate::sync::SyncSession::on_file_saved),
	/// which editor integrations call after each save. The CLI has no watch
	/// mode, so this has no effect on `qcpsync` commands.
	pub push_on_save: bool,

	/// Initial overwrite policy of every batch
	pub overwrite: OverwritePolicy,

	// ========================================================================
	// ACTIVITY LOG
	// ========================================================================
	/// Record push/pull/backup results in `.qcp/qcp-log.json`
	pub save_log: bool,

	/// Oldest entries are dropped past this count
	pub max_log_entries: usize,

	// ========================================================================
	// REMOTE
	// ========================================================================
	/// Salesforce API version used for SOAP login and REST calls
	pub api_version: String,

	/// HTTP request timeout in seconds
	pub request_timeout_secs: u64,
}

impl Default for Settings {
	fn default() -> Self {
		Settings {
			source_dir: "src".to_string(),
			push_on_save: false,
			overwrite: OverwritePolicy::Ask,
			save_log: true,
			max_log_entries: 150,
			api_version: "48.0".to_string(),
			request_timeout_secs: 30,
		}
	}
}

impl Settings {
	/// Defaults, overlaid with the workspace settings file and the environment
	pub fn load(root: &Path) -> Result<Self, SyncError> {
		let path = root.join(STATE_DIR).join(SETTINGS_FILE);
		let mut settings = match std::fs::read_to_string(&path) {
			Ok(contents) => Self::from_toml_str(&contents)
				.map_err(|e| SyncError::persistence(&path, e.to_string()))?,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
			Err(e) => return Err(SyncError::persistence(&path, e)),
		};
		settings.apply_env()?;
		Ok(settings)
	}

	/// Parse a settings file; missing keys keep their defaults
	pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(contents)
	}

	/// Overlay `QCPSYNC_*` variables from the process environment
	pub fn apply_env(&mut self) -> Result<(), SyncError> {
		self.apply_vars(std::env::vars())
	}

	/// Overlay `QCPSYNC_*` variables from `vars`; unknown names are ignored
	pub fn apply_vars<I>(&mut self, vars: I) -> Result<(), SyncError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		for (key, value) in vars {
			let Some(name) = key.strip_prefix(ENV_PREFIX) else {
				continue;
			};
			match name {
				"SOURCE_DIR" => self.source_dir = value,
				"PUSH_ON_SAVE" => self.push_on_save = parse_env(&key, &value, parse_bool)?,
				"OVERWRITE" => self.overwrite = parse_env(&key, &value, |v| v.parse::<OverwritePolicy>())?,
				"SAVE_LOG" => self.save_log = parse_env(&key, &value, parse_bool)?,
				"MAX_LOG_ENTRIES" => {
					self.max_log_entries = parse_env(&key, &value, |v| v.parse::<usize>())?
				}
				"API_VERSION" => self.api_version = value,
				"REQUEST_TIMEOUT_SECS" => {
					self.request_timeout_secs = parse_env(&key, &value, |v| v.parse::<u64>())?
				}
				_ => {}
			}
		}
		Ok(())
	}

	/// Render as a settings file
	pub fn to_toml_string(&self) -> Result<String, SyncError> {
		toml::to_string_pretty(self).map_err(|e| SyncError::InvalidConfig { message: e.to_string() })
	}
}

fn parse_bool(value: &str) -> Result<bool, String> {
	match value.to_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(format!("expected a boolean, got {}", value)),
	}
}

fn parse_env<T, E, F>(key: &str, value: &str, parse: F) -> Result<T, SyncError>
where
	F: FnOnce(&str) -> Result<T, E>,
	E: std::fmt::Display,
{
	parse(value).map_err(|e| SyncError::InvalidConfig { message: format!("{}: {}", key, e) })
}


// vim: ts=4
