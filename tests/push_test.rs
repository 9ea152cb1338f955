//! Push engine tests against the in-memory org
//!
//! Covers:
//! - per-item failure isolation within a batch
//! - 0 / 1 / many name matches for unlinked files
//! - cancellation between items and through the overwrite prompt
//! - sticky `*All` answers
//! - remote changes made since the last sync

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use qcpsync::callbacks::{CallbackBuilder, NoCallbacks};
use qcpsync::config::ConfigStore;
use qcpsync::conflict::OverwriteResolver;
use qcpsync::error::SyncError;
use qcpsync::settings::Settings;
use qcpsync::strategies::{OverwriteChoice, OverwritePolicy};
use qcpsync::sync::{ItemStatus, PullTarget, PushOutcome, SyncSession};
use qcpsync::transport::MemoryTransport;
use qcpsync::types::{LocalFileEntry, OrgInfo, ScriptRecord};
use qcpsync::utils::CancelToken;

// ============================================================================
// Helper Functions for Test Setup
// ============================================================================

async fn new_session(dir: &TempDir) -> SyncSession<MemoryTransport> {
	SyncSession::init(MemoryTransport::new(), dir.path(), Settings::default(), OrgInfo::default())
		.await
		.unwrap()
}

/// Write `src/<name>.ts` for every name and return the paths
async fn write_scripts(session: &SyncSession<MemoryTransport>, names: &[&str]) -> Vec<PathBuf> {
	let mut paths = Vec::new();
	for name in names {
		let path = PathBuf::from(format!("src/{}.ts", name));
		session.workspace().write(&path, &format!("// {} local\n", name)).await.unwrap();
		paths.push(path);
	}
	paths
}

fn record(id: &str, name: &str, code: &str) -> ScriptRecord {
	ScriptRecord {
		id: id.to_string(),
		name: name.to_string(),
		code: Some(code.to_string()),
		..Default::default()
	}
}

// ============================================================================
// Batch failure isolation
// ============================================================================

#[tokio::test]
async fn test_failed_items_do_not_stop_the_batch() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let paths = write_scripts(&session, &["A", "B", "C", "D", "E"]).await;
	session.transport().fail_writes_for("B");
	session.transport().fail_writes_for("D");

	let report =
		session.push_all(&paths, OverwritePolicy::Ask, &CancelToken::new(), &NoCallbacks).await;

	assert_eq!(report.succeeded(), 3);
	assert_eq!(report.failed(), 2);
	assert!(matches!(
		report.status_of("src/B.ts"),
		Some(ItemStatus::Failed(SyncError::RemoteWrite { id: None, .. }))
	));

	// Successful siblings are linked, in memory and on disk
	let stored = ConfigStore::new(session.workspace().clone()).load().await.unwrap();
	for name in ["A", "C", "E"] {
		let path = format!("src/{}.ts", name);
		assert!(session.config().linked_id(&path).is_some(), "{} not linked", path);
		assert_eq!(stored.linked_id(&path), session.config().linked_id(&path));
	}
	assert!(stored.linked_id("src/B.ts").is_none());
	assert_eq!(session.transport().records().len(), 3);
}

// ============================================================================
// Name matching for unlinked files
// ============================================================================

#[tokio::test]
async fn test_files_outside_the_workspace_are_refused() {
	let dir = TempDir::new().unwrap();
	let outside = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let stray = outside.path().join("A.ts");
	tokio::fs::write(&stray, "// outside\n").await.unwrap();
	session.workspace().write(Path::new("src/A.ts"), "// inside\n").await.unwrap();

	let mut resolver = OverwriteResolver::new(OverwritePolicy::Ask);
	for path in [stray, PathBuf::from("src/../../A.ts")] {
		let err = session.push_one(&path, &mut resolver, &NoCallbacks).await.unwrap_err();
		assert!(matches!(err, SyncError::InvalidConfig { .. }), "{}", err);
	}
	assert!(session.transport().records().is_empty());
	assert!(session.config().entry_for_path("src/A.ts").is_none());
}

#[tokio::test]
async fn test_no_match_creates_record() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	write_scripts(&session, &["Fresh"]).await;

	let mut resolver = OverwriteResolver::new(OverwritePolicy::Ask);
	let outcome =
		session.push_one(Path::new("src/Fresh.ts"), &mut resolver, &NoCallbacks).await.unwrap();
	assert!(matches!(outcome, PushOutcome::Pushed { created: true, .. }));
	assert_eq!(session.transport().records()[0].name, "Fresh");
}

#[tokio::test]
async fn test_single_match_asks_before_overwriting() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	session.transport().insert_record(record("a1", "Pricing", "// remote\n"));
	write_scripts(&session, &["Pricing"]).await;

	let asked = Arc::new(AtomicUsize::new(0));
	let counter = asked.clone();
	let callbacks = CallbackBuilder::new()
		.on_conflict(move |conflict| {
			counter.fetch_add(1, Ordering::SeqCst);
			assert_eq!(conflict.record_id, "a1");
			assert_eq!(conflict.remote, "// remote\n");
			OverwriteChoice::Overwrite
		})
		.build();

	let mut resolver = OverwriteResolver::new(OverwritePolicy::Ask);
	let outcome = session
		.push_one(Path::new("src/Pricing.ts"), &mut resolver, callbacks.as_ref())
		.await
		.unwrap();

	assert_eq!(outcome, PushOutcome::Pushed { record_id: "a1".to_string(), created: false });
	assert_eq!(asked.load(Ordering::SeqCst), 1);
	assert_eq!(session.transport().get("a1").unwrap().code.as_deref(), Some("// Pricing local\n"));
	assert_eq!(session.config().linked_id("src/Pricing.ts"), Some("a1"));
}

#[tokio::test]
async fn test_backup_choice_saves_remote_code() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	session.transport().insert_record(record("a1", "Pricing", "// remote\n"));
	write_scripts(&session, &["Pricing"]).await;

	let mut resolver = OverwriteResolver::new(OverwritePolicy::Backup);
	session.push_one(Path::new("src/Pricing.ts"), &mut resolver, &NoCallbacks).await.unwrap();

	let backup_dir = resolver.backup_dir().unwrap().to_path_buf();
	let name = backup_dir.file_name().unwrap().to_string_lossy().into_owned();
	assert!(name.starts_with("remote-"));
	let saved = tokio::fs::read_to_string(backup_dir.join("Pricing.ts")).await.unwrap();
	assert_eq!(saved, "// remote\n");
}

#[tokio::test]
async fn test_many_matches_is_ambiguous() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	session.transport().insert_record(record("a1", "Dup", "1"));
	session.transport().insert_record(record("a2", "Dup", "2"));
	write_scripts(&session, &["Dup"]).await;

	let mut resolver = OverwriteResolver::new(OverwritePolicy::Overwrite);
	let err =
		session.push_one(Path::new("src/Dup.ts"), &mut resolver, &NoCallbacks).await.unwrap_err();

	match err {
		SyncError::AmbiguousName { name, ids } => {
			assert_eq!(name, "Dup");
			assert_eq!(ids, vec!["a1".to_string(), "a2".to_string()]);
		}
		other => panic!("unexpected error: {}", other),
	}
	assert_eq!(session.transport().get("a1").unwrap().code.as_deref(), Some("1"));
	assert!(session.config().linked_id("src/Dup.ts").is_none());
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_between_items() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let paths = write_scripts(&session, &["A", "B", "C", "D", "E"]).await;

	let cancel = CancelToken::new();
	let token = cancel.clone();
	let finished = Arc::new(AtomicUsize::new(0));
	let callbacks = CallbackBuilder::new()
		.on_item(move |_| {
			if finished.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
				token.cancel();
			}
		})
		.build();

	let report = session.push_all(&paths, OverwritePolicy::Ask, &cancel, callbacks.as_ref()).await;

	assert_eq!(report.succeeded(), 2);
	assert_eq!(report.not_attempted(), 3);
	assert_eq!(report.summary(), "2 succeeded, 0 failed, 0 skipped, 3 not attempted");
	assert_eq!(session.transport().records().len(), 2);
	assert!(session.config().linked_id("src/B.ts").is_some());
	assert!(session.config().linked_id("src/C.ts").is_none());
}

#[tokio::test]
async fn test_cancel_answer_stops_the_batch() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	for (id, name) in [("a1", "A"), ("a2", "B"), ("a3", "C")] {
		session.transport().insert_record(record(id, name, "// remote\n"));
	}
	let paths = write_scripts(&session, &["A", "B", "C"]).await;

	let callbacks = CallbackBuilder::new().on_conflict(|_| OverwriteChoice::Cancel).build();
	let report = session
		.push_all(&paths, OverwritePolicy::Ask, &CancelToken::new(), callbacks.as_ref())
		.await;

	assert_eq!(report.not_attempted(), 3);
	for id in ["a1", "a2", "a3"] {
		assert_eq!(session.transport().get(id).unwrap().code.as_deref(), Some("// remote\n"));
	}
}

// ============================================================================
// Sticky answers
// ============================================================================

#[tokio::test]
async fn test_skip_all_at_second_file() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let names = ["A", "B", "C", "D", "E"];
	for (i, name) in names.iter().enumerate() {
		session.transport().insert_record(record(&format!("a{}", i + 1), name, "// remote\n"));
	}
	let paths = write_scripts(&session, &names).await;

	let asked = Arc::new(AtomicUsize::new(0));
	let counter = asked.clone();
	let callbacks = CallbackBuilder::new()
		.on_conflict(move |_| match counter.fetch_add(1, Ordering::SeqCst) {
			0 => OverwriteChoice::Overwrite,
			_ => OverwriteChoice::SkipAll,
		})
		.build();

	let report = session
		.push_all(&paths, OverwritePolicy::Ask, &CancelToken::new(), callbacks.as_ref())
		.await;

	assert_eq!(asked.load(Ordering::SeqCst), 2);
	assert_eq!(report.succeeded(), 1);
	assert_eq!(report.skipped(), 4);
	assert_eq!(session.transport().get("a1").unwrap().code.as_deref(), Some("// A local\n"));
	for id in ["a2", "a3", "a4", "a5"] {
		assert_eq!(session.transport().get(id).unwrap().code.as_deref(), Some("// remote\n"));
	}
}

// ============================================================================
// Remote changes since the last sync
// ============================================================================

#[tokio::test]
async fn test_remote_change_is_not_silently_overwritten() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let id = session.transport().insert("Pricing", "// v1\n");
	session
		.pull_one(PullTarget::Name("Pricing".into()), OverwritePolicy::Ask, &NoCallbacks)
		.await
		.unwrap();

	session.transport().edit(&id, "// theirs\n");
	session.workspace().write(Path::new("src/Pricing.ts"), "// mine\n").await.unwrap();

	let mut resolver = OverwriteResolver::new(OverwritePolicy::Skip);
	let outcome =
		session.push_one(Path::new("src/Pricing.ts"), &mut resolver, &NoCallbacks).await.unwrap();
	assert_eq!(outcome, PushOutcome::Skipped { record_id: id.clone() });
	assert_eq!(session.transport().get(&id).unwrap().code.as_deref(), Some("// theirs\n"));

	let mut resolver = OverwriteResolver::new(OverwritePolicy::Overwrite);
	session.push_one(Path::new("src/Pricing.ts"), &mut resolver, &NoCallbacks).await.unwrap();
	assert_eq!(session.transport().get(&id).unwrap().code.as_deref(), Some("// mine\n"));

	// Our own write does not count as a remote change
	session.workspace().write(Path::new("src/Pricing.ts"), "// mine 2\n").await.unwrap();
	let mut resolver = OverwriteResolver::new(OverwritePolicy::Skip);
	let outcome =
		session.push_one(Path::new("src/Pricing.ts"), &mut resolver, &NoCallbacks).await.unwrap();
	assert!(matches!(outcome, PushOutcome::Pushed { .. }));
}

#[tokio::test]
async fn test_links_without_modified_date_push_directly() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	session.transport().insert_record(record("a1", "Legacy", "// theirs\n"));
	write_scripts(&session, &["Legacy"]).await;

	// Link as an older config would have stored it
	let store = ConfigStore::new(session.workspace().clone());
	let mut config = store.load().await.unwrap();
	config.link(LocalFileEntry {
		file_name: "Legacy.ts".to_string(),
		file_path: "src/Legacy.ts".to_string(),
		linked_record_id: Some("a1".to_string()),
		remote_modified_date: None,
	});
	store.save(&config).await.unwrap();
	session.reload_config().await.unwrap();

	let mut resolver = OverwriteResolver::new(OverwritePolicy::Skip);
	let outcome =
		session.push_one(Path::new("src/Legacy.ts"), &mut resolver, &NoCallbacks).await.unwrap();
	assert!(matches!(outcome, PushOutcome::Pushed { created: false, .. }));
	assert_eq!(session.transport().get("a1").unwrap().code.as_deref(), Some("// Legacy local\n"));
}

// vim: ts=4
