//! Sync session and engines
//!
//! A [`SyncSession`] owns everything one run of the tool works with: the
//! transport, the workspace, the loaded config and the settings. The engines
//! are implemented as methods on it, split by concern:
//!
//! - [`pull`]: remote records to local files
//! - [`push`]: local files to remote records
//! - [`diff`]: read-only comparisons
//! - [`backup`]: timestamped copies of either side
//! - [`report`]: per-item batch outcomes

use std::path::Path;

use crate::activity::{Action, ActivityLog};
use crate::config::{ConfigStore, SyncConfig};
use crate::error::SyncError;
use crate::logging::*;
use crate::settings::Settings;
use crate::transport::{ScriptQuery, ScriptTransport};
use crate::types::{Lookup, OrgInfo, ScriptRecord};
use crate::workspace::Workspace;

pub mod backup;
pub mod diff;
pub mod pull;
pub mod push;
pub mod report;

pub use backup::BackupReport;
pub use diff::{CompareResult, FieldChange};
pub use pull::{PullOutcome, PullTarget};
pub use push::PushOutcome;
pub use report::{BatchReport, ItemReport, ItemStatus};

/// Lines appended to `.gitignore` by `init`
const GITIGNORE_BLOCK: &str = "# Added by qcpsync\n.qcp\n";

/// What a saved file means for the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
	/// The config file was edited and has been reloaded
	ConfigReloaded,

	/// A source file that should be pushed (push on save is enabled)
	PushCandidate(String),

	/// Nothing to do
	Ignored,
}

/// Context of one tool run
pub struct SyncSession<T: ScriptTransport> {
	transport: T,
	workspace: Workspace,
	store: ConfigStore,
	config: SyncConfig,
	settings: Settings,
	activity: ActivityLog,
}

impl<T: ScriptTransport> SyncSession<T> {
	/// Session over an already loaded config
	pub fn new(transport: T, workspace: Workspace, settings: Settings, config: SyncConfig) -> Self {
		let store = ConfigStore::new(workspace.clone());
		let activity = ActivityLog::new(workspace.clone(), &settings);
		SyncSession { transport, workspace, store, config, settings, activity }
	}

	/// Open an initialized workspace
	pub async fn load(transport: T, root: &Path, settings: Settings) -> Result<Self, SyncError> {
		let workspace = Workspace::new(root, &settings.source_dir);
		let store = ConfigStore::new(workspace.clone());
		if !store.exists().await {
			return Err(SyncError::InvalidConfig {
				message: format!(
					"{} is not initialized, run `qcpsync init` first",
					root.display()
				),
			});
		}
		let config = store.load().await?;
		Ok(Self::new(transport, workspace, settings, config))
	}

	/// Initialize a workspace (or update the org of an existing one)
	///
	/// Writes the config with `org_info`, keeping existing file links, creates
	/// the source directory and adds the state directory to `.gitignore`.
	pub async fn init(
		transport: T,
		root: &Path,
		settings: Settings,
		org_info: OrgInfo,
	) -> Result<Self, SyncError> {
		let workspace = Workspace::new(root, &settings.source_dir);
		let store = ConfigStore::new(workspace.clone());
		let mut config = store.load_or_default().await?;
		config.org_info = org_info;
		store.save(&config).await?;

		tokio::fs::create_dir_all(workspace.source_dir()).await?;
		ensure_gitignore(&workspace).await?;
		info!("Initialized {}", root.display());

		Ok(Self::new(transport, workspace, settings, config))
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	pub fn workspace(&self) -> &Workspace {
		&self.workspace
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn activity(&self) -> &ActivityLog {
		&self.activity
	}

	/// Re-read the config from disk, dropping in-memory state
	pub async fn reload_config(&mut self) -> Result<(), SyncError> {
		self.config = self.store.load().await?;
		debug!("Config reloaded");
		Ok(())
	}

	/// React to a file being saved in the workspace
	pub async fn on_file_saved(&mut self, path: &Path) -> Result<SaveAction, SyncError> {
		let rel = self.workspace.relative(path);
		let config_rel = self.workspace.relative(&self.workspace.config_path());
		if rel == config_rel {
			self.reload_config().await?;
			return Ok(SaveAction::ConfigReloaded);
		}

		let in_source_dir =
			Path::new(&rel).parent().map(|p| self.workspace.resolve(p) == self.workspace.source_dir());
		if self.settings.push_on_save
			&& in_source_dir.unwrap_or(false)
			&& crate::mapper::is_script_file(Path::new(&rel))
		{
			return Ok(SaveAction::PushCandidate(rel));
		}
		Ok(SaveAction::Ignored)
	}

	/// Check the org credentials
	pub async fn check(&self) -> Result<(), SyncError> {
		self.transport.check().await?;
		Ok(())
	}

	/// Every remote record, without code, sorted by name
	pub async fn list_remote(&self) -> Result<Vec<ScriptRecord>, SyncError> {
		let result = self
			.transport
			.query(&ScriptQuery::All { with_code: false })
			.await
			.map_err(SyncError::query)?;
		let mut records = result.records;
		records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
		Ok(records)
	}

	/// Find the record carrying `name`
	///
	/// A count query runs first; the ids of every match are only fetched
	/// when the name is ambiguous.
	pub async fn lookup_by_name(&self, name: &str, with_code: bool) -> Result<Lookup, SyncError> {
		let count = self
			.transport
			.query(&ScriptQuery::CountByName(name.to_string()))
			.await
			.map_err(SyncError::query)?
			.total_size;
		debug!("{} record(s) named {:?}", count, name);

		match count {
			0 => Ok(Lookup::NotFound),
			1 => {
				let query = ScriptQuery::ByName { name: name.to_string(), with_code };
				let result = self.transport.query(&query).await.map_err(SyncError::query)?;
				Ok(result.records.into_iter().next().map(Lookup::Found).unwrap_or(Lookup::NotFound))
			}
			_ => {
				let query = ScriptQuery::ByName { name: name.to_string(), with_code: false };
				let result = self.transport.query(&query).await.map_err(SyncError::query)?;
				Ok(Lookup::Ambiguous(result.records.into_iter().map(|r| r.id).collect()))
			}
		}
	}

	/// Write the in-memory config to disk
	pub(crate) async fn persist(&self) -> Result<(), SyncError> {
		self.store.save(&self.config).await
	}

	/// Append a batch to the activity log; failures are only reported
	pub(crate) async fn log_activity(&self, action: Action, report: &BatchReport) {
		if let Err(e) = self.activity.record(action, report).await {
			warn!("Could not update the activity log: {}", e);
		}
	}

	/// Append one already rendered item outcome to the activity log
	pub(crate) async fn log_activity_item(
		&self,
		action: Action,
		item: &str,
		record_id: Option<&str>,
		outcome: String,
	) {
		if let Err(e) = self.activity.record_item(action, item, record_id, outcome).await {
			warn!("Could not update the activity log: {}", e);
		}
	}
}

/// Add the state directory to `.gitignore` unless it is already listed
async fn ensure_gitignore(workspace: &Workspace) -> Result<(), SyncError> {
	let path = workspace.gitignore_path();
	let existing = if workspace.exists(&path).await {
		workspace.read_to_string(&path).await?
	} else {
		String::new()
	};
	let state_dir = crate::workspace::STATE_DIR;
	if existing.lines().any(|l| {
		let l = l.trim().trim_end_matches('/');
		l == state_dir || l.trim_start_matches('/') == state_dir
	}) {
		return Ok(());
	}

	let mut content = existing;
	if !content.is_empty() && !content.ends_with('\n') {
		content.push('\n');
	}
	content.push_str(GITIGNORE_BLOCK);
	workspace.write(&path, &content).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::MemoryTransport;
	use tempfile::TempDir;

	async fn session(dir: &TempDir) -> SyncSession<MemoryTransport> {
		SyncSession::init(MemoryTransport::new(), dir.path(), Settings::default(), OrgInfo::default())
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_init_is_idempotent() {
		let dir = TempDir::new().unwrap();
		let s = session(&dir).await;
		let ws = s.workspace().clone();
		drop(s);
		session(&dir).await;

		let gitignore = ws.read_to_string(&ws.gitignore_path()).await.unwrap();
		assert_eq!(gitignore, GITIGNORE_BLOCK);
		assert!(ws.exists(&ws.source_dir()).await);
		assert!(ws.exists(&ws.config_path()).await);
	}

	#[tokio::test]
	async fn test_load_requires_init() {
		let dir = TempDir::new().unwrap();
		let result =
			SyncSession::load(MemoryTransport::new(), dir.path(), Settings::default()).await;
		assert!(matches!(result, Err(SyncError::InvalidConfig { .. })));
	}

	#[tokio::test]
	async fn test_lookup_by_name() {
		let dir = TempDir::new().unwrap();
		let s = session(&dir).await;
		s.transport().insert("Solo", "x");
		let a1 = s.transport().insert("Twin", "1");
		let a2 = s.transport().insert("Twin", "2");

		assert_eq!(s.lookup_by_name("None", true).await.unwrap(), Lookup::NotFound);
		match s.lookup_by_name("Solo", true).await.unwrap() {
			Lookup::Found(r) => assert_eq!(r.code.as_deref(), Some("x")),
			other => panic!("unexpected {:?}", other),
		}
		assert_eq!(s.lookup_by_name("Twin", true).await.unwrap(), Lookup::Ambiguous(vec![a1, a2]));
	}

	#[tokio::test]
	async fn test_on_file_saved() {
		let dir = TempDir::new().unwrap();
		let mut s = session(&dir).await;
		let config_path = s.workspace().config_path();
		assert_eq!(s.on_file_saved(&config_path).await.unwrap(), SaveAction::ConfigReloaded);
		assert_eq!(s.on_file_saved(Path::new("src/A.ts")).await.unwrap(), SaveAction::Ignored);

		s.settings.push_on_save = true;
		assert_eq!(
			s.on_file_saved(Path::new("src/A.ts")).await.unwrap(),
			SaveAction::PushCandidate("src/A.ts".to_string())
		);
		assert_eq!(s.on_file_saved(Path::new("notes.ts")).await.unwrap(), SaveAction::Ignored);
		assert_eq!(s.on_file_saved(Path::new("src/A.md")).await.unwrap(), SaveAction::Ignored);
	}
}

// vim: ts=4
