//! Workspace layout and file persistence
//!
//! Everything the engines read or write on disk goes through [`Workspace`]:
//! the source directory holding script files and the `.qcp` directory holding
//! the config, activity log, settings and backups.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tokio::fs as afs;

use crate::error::SyncError;

/// Directory holding tool state, relative to the workspace root
pub const STATE_DIR: &str = ".qcp";
pub const CONFIG_FILE: &str = "qcp-config.json";
pub const CONFIG_BACKUP_FILE: &str = "qcp-config.bak.json";
pub const LOG_FILE: &str = "qcp-log.json";
pub const LOG_BACKUP_FILE: &str = "qcp-log.bak.json";
pub const SETTINGS_FILE: &str = "settings.toml";
pub const BACKUPS_DIR: &str = "backups";

/// A project directory containing script files and tool state
#[derive(Debug, Clone)]
pub struct Workspace {
	root: PathBuf,
	source_dir: String,
}

impl Workspace {
	pub fn new<P: Into<PathBuf>>(root: P, source_dir: &str) -> Self {
		Workspace { root: root.into(), source_dir: source_dir.trim_matches('/').to_string() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Directory holding the script files (`<root>/src` by default)
	pub fn source_dir(&self) -> PathBuf {
		self.root.join(&self.source_dir)
	}

	pub fn state_dir(&self) -> PathBuf {
		self.root.join(STATE_DIR)
	}

	pub fn config_path(&self) -> PathBuf {
		self.state_dir().join(CONFIG_FILE)
	}

	pub fn config_backup_path(&self) -> PathBuf {
		self.state_dir().join(CONFIG_BACKUP_FILE)
	}

	pub fn log_path(&self) -> PathBuf {
		self.state_dir().join(LOG_FILE)
	}

	pub fn log_backup_path(&self) -> PathBuf {
		self.state_dir().join(LOG_BACKUP_FILE)
	}

	pub fn settings_path(&self) -> PathBuf {
		self.state_dir().join(SETTINGS_FILE)
	}

	pub fn backups_dir(&self) -> PathBuf {
		self.state_dir().join(BACKUPS_DIR)
	}

	pub fn gitignore_path(&self) -> PathBuf {
		self.root.join(".gitignore")
	}

	/// Path of a source file, as stored in the config (`src/Name.ts`)
	pub fn source_file_path(&self, file_name: &str) -> String {
		if self.source_dir.is_empty() {
			file_name.to_string()
		} else {
			format!("{}/{}", self.source_dir, file_name)
		}
	}

	/// Workspace-relative, `/`-separated form of `path`
	///
	/// Absolute paths under the root lose the root prefix; `.` and inner `..`
	/// components are folded so `./src/A.ts`, `lib/../src/A.ts` and `src/A.ts`
	/// compare equal. Absolute paths outside the root are returned unchanged.
	pub fn relative(&self, path: &Path) -> String {
		let rel = match path.strip_prefix(&self.root) {
			Ok(rel) => rel,
			Err(_) if path.has_root() => return path.to_string_lossy().into_owned(),
			Err(_) => path,
		};
		let mut parts: Vec<String> = Vec::new();
		for component in rel.components() {
			match component {
				Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
				Component::ParentDir if parts.last().map_or(false, |p| p != "..") => {
					parts.pop();
				}
				Component::ParentDir => parts.push("..".to_string()),
				_ => {}
			}
		}
		parts.join("/")
	}

	/// Like [`relative`](Self::relative), for paths that must lie inside the workspace
	pub fn contained(&self, path: &Path) -> Result<String, SyncError> {
		let rel = self.relative(path);
		if Path::new(&rel).has_root() || rel == ".." || rel.starts_with("../") {
			return Err(SyncError::InvalidConfig {
				message: format!(
					"{} is outside the workspace {}",
					path.display(),
					self.root.display()
				),
			});
		}
		Ok(rel)
	}

	/// Absolute form of a workspace-relative path
	pub fn resolve(&self, path: &Path) -> PathBuf {
		if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.root.join(path)
		}
	}

	pub async fn exists(&self, path: &Path) -> bool {
		afs::try_exists(self.resolve(path)).await.unwrap_or(false)
	}

	pub async fn read_to_string(&self, path: &Path) -> Result<String, SyncError> {
		Ok(afs::read_to_string(self.resolve(path)).await?)
	}

	/// Write `content`, creating parent directories as needed
	pub async fn write(&self, path: &Path, content: &str) -> Result<(), SyncError> {
		let path = self.resolve(path);
		if let Some(parent) = path.parent() {
			afs::create_dir_all(parent).await?;
		}
		afs::write(&path, content).await?;
		Ok(())
	}

	/// Copy a file, creating the destination's parent directories
	pub async fn copy(&self, src: &Path, dest: &Path) -> Result<(), SyncError> {
		let dest = self.resolve(dest);
		if let Some(parent) = dest.parent() {
			afs::create_dir_all(parent).await?;
		}
		afs::copy(self.resolve(src), &dest).await?;
		Ok(())
	}

	/// Read a JSON document; JSON5 extensions (comments, trailing commas) are accepted
	pub async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, SyncError> {
		let path = self.resolve(path);
		let contents =
			afs::read_to_string(&path).await.map_err(|e| SyncError::persistence(&path, e))?;
		json5::from_str(&contents).map_err(|e| SyncError::persistence(&path, e.to_string()))
	}

	/// Write a JSON document (pretty-printed) through a temp file and rename
	pub async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), SyncError> {
		let path = self.resolve(path);
		let json =
			serde_json::to_string_pretty(value).map_err(|e| SyncError::persistence(&path, e))?;

		if let Some(parent) = path.parent() {
			afs::create_dir_all(parent).await.map_err(|e| SyncError::persistence(&path, e))?;
		}
		let tmp = path.with_extension("json.tmp");
		afs::write(&tmp, json).await.map_err(|e| SyncError::persistence(&path, e))?;
		afs::rename(&tmp, &path).await.map_err(|e| SyncError::persistence(&path, e))
	}

	/// Files directly inside `dir` whose name matches the glob `pattern`, sorted
	pub async fn list_files(&self, dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, SyncError> {
		let pattern = glob::Pattern::new(pattern)
			.map_err(|e| SyncError::InvalidConfig { message: format!("bad pattern: {}", e) })?;
		let dir = self.resolve(dir);
		if !afs::try_exists(&dir).await.unwrap_or(false) {
			return Ok(vec![]);
		}

		let mut files = Vec::new();
		let mut entries = afs::read_dir(&dir).await?;
		while let Some(entry) = entries.next_entry().await? {
			if !entry.file_type().await?.is_file() {
				continue;
			}
			if pattern.matches(&entry.file_name().to_string_lossy()) {
				files.push(entry.path());
			}
		}
		files.sort();
		Ok(files)
	}

	/// Every script file in the source directory
	pub async fn source_files(&self) -> Result<Vec<PathBuf>, SyncError> {
		self.list_files(&self.source_dir(), &format!("*.{}", crate::mapper::FILE_EXTENSION)).await
	}
}


// vim: ts=4
