//! Pull engine tests against the in-memory org
//!
//! Covers:
//! - per-item failure isolation and duplicate record names
//! - pulling by name (found, missing, ambiguous)
//! - sticky `*All` answers and cancellation
//! - query failures aborting before any file is written

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use qcpsync::activity::Action;
use qcpsync::callbacks::{CallbackBuilder, NoCallbacks};
use qcpsync::config::ConfigStore;
use qcpsync::error::SyncError;
use qcpsync::settings::Settings;
use qcpsync::strategies::{OverwriteChoice, OverwritePolicy};
use qcpsync::sync::{ItemStatus, PullOutcome, PullTarget, SyncSession};
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

/// Insert one record per name, in order, with code `// <name> remote`
fn seed(session: &SyncSession<MemoryTransport>, names: &[&str]) -> Vec<String> {
	names
		.iter()
		.map(|name| session.transport().insert(name, &format!("// {} remote\n", name)))
		.collect()
}

async fn read(session: &SyncSession<MemoryTransport>, path: &str) -> String {
	session.workspace().read_to_string(Path::new(path)).await.unwrap()
}

// ============================================================================
// Pull all
// ============================================================================

#[tokio::test]
async fn test_pull_all_writes_every_record() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let ids = seed(&session, &["A", "B", "C"]);

	let report = session
		.pull_all(OverwritePolicy::Ask, &CancelToken::new(), &NoCallbacks)
		.await
		.unwrap();

	assert_eq!(report.succeeded(), 3);
	assert_eq!(read(&session, "src/B.ts").await, "// B remote\n");

	let stored = ConfigStore::new(session.workspace().clone()).load().await.unwrap();
	assert_eq!(stored.files.len(), 3);
	assert_eq!(stored.linked_id("src/A.ts"), Some(ids[0].as_str()));
	assert!(stored.entry_for_path("src/A.ts").unwrap().remote_modified_date.is_some());
}

#[tokio::test]
async fn test_failed_items_do_not_stop_the_batch() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	seed(&session, &["A", "B", "C", "D", "E"]);

	// A directory where B's file should go makes that one write fail
	tokio::fs::create_dir_all(dir.path().join("src/B.ts")).await.unwrap();

	let report = session
		.pull_all(OverwritePolicy::Overwrite, &CancelToken::new(), &NoCallbacks)
		.await
		.unwrap();

	assert_eq!(report.succeeded(), 4);
	assert_eq!(report.failed(), 1);
	assert!(matches!(report.status_of("src/B.ts"), Some(ItemStatus::Failed(_))));
	assert_eq!(read(&session, "src/E.ts").await, "// E remote\n");

	let stored = ConfigStore::new(session.workspace().clone()).load().await.unwrap();
	assert!(stored.linked_id("src/B.ts").is_none());
	for name in ["A", "C", "D", "E"] {
		assert!(stored.linked_id(&format!("src/{}.ts", name)).is_some());
	}
}

#[tokio::test]
async fn test_duplicate_names_fail_per_item() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	for id in ["a1", "a2"] {
		session.transport().insert_record(ScriptRecord {
			id: id.to_string(),
			name: "Dup".to_string(),
			code: Some(format!("// {}\n", id)),
			..Default::default()
		});
	}
	seed(&session, &["Other"]);

	let report = session
		.pull_all(OverwritePolicy::Ask, &CancelToken::new(), &NoCallbacks)
		.await
		.unwrap();

	assert_eq!(report.succeeded(), 1);
	assert_eq!(report.failed(), 2);
	for (_, error) in report.failures() {
		match error {
			SyncError::AmbiguousName { name, ids } => {
				assert_eq!(name, "Dup");
				assert_eq!(ids, &vec!["a1".to_string(), "a2".to_string()]);
			}
			other => panic!("unexpected error: {}", other),
		}
	}
	assert!(!session.workspace().exists(Path::new("src/Dup.ts")).await);
}

#[tokio::test]
async fn test_records_sharing_a_file_name_fail_per_item() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	for (id, name) in [("a1", "A/B"), ("a2", "A:B")] {
		session.transport().insert_record(ScriptRecord {
			id: id.to_string(),
			name: name.to_string(),
			code: Some(format!("// {}\n", id)),
			..Default::default()
		});
	}
	seed(&session, &["Other"]);

	let report = session
		.pull_all(OverwritePolicy::Overwrite, &CancelToken::new(), &NoCallbacks)
		.await
		.unwrap();

	assert_eq!(report.succeeded(), 1);
	assert_eq!(report.failed(), 2);
	for (_, error) in report.failures() {
		match error {
			SyncError::FileClash { path, ids } => {
				assert_eq!(path, "src/A_B.ts");
				assert_eq!(ids, &vec!["a1".to_string(), "a2".to_string()]);
			}
			other => panic!("unexpected error: {}", other),
		}
	}
	assert!(!session.workspace().exists(Path::new("src/A_B.ts")).await);
	assert!(session.config().entry_for_record("a1").is_none());
	assert!(session.config().entry_for_record("a2").is_none());
	assert_eq!(read(&session, "src/Other.ts").await, "// Other remote\n");
}

#[tokio::test]
async fn test_pull_uses_linked_path() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let ids = seed(&session, &["Pricing"]);

	let store = ConfigStore::new(session.workspace().clone());
	let mut config = store.load().await.unwrap();
	config.link(LocalFileEntry {
		file_name: "Renamed.ts".to_string(),
		file_path: "src/Renamed.ts".to_string(),
		linked_record_id: Some(ids[0].clone()),
		remote_modified_date: None,
	});
	store.save(&config).await.unwrap();
	session.reload_config().await.unwrap();

	session.pull_all(OverwritePolicy::Ask, &CancelToken::new(), &NoCallbacks).await.unwrap();

	assert_eq!(read(&session, "src/Renamed.ts").await, "// Pricing remote\n");
	assert!(!session.workspace().exists(Path::new("src/Pricing.ts")).await);
}

#[tokio::test]
async fn test_query_failure_writes_nothing() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	seed(&session, &["A"]);
	session.transport().fail_queries(true);

	let err = session
		.pull_all(OverwritePolicy::Ask, &CancelToken::new(), &NoCallbacks)
		.await
		.unwrap_err();

	assert!(matches!(err, SyncError::RemoteQuery { .. }));
	assert!(!session.workspace().exists(Path::new("src/A.ts")).await);
	assert!(session.config().files.is_empty());
}

// ============================================================================
// Pull one
// ============================================================================

#[tokio::test]
async fn test_pull_by_name() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let ids = seed(&session, &["Pricing", "Other"]);

	let outcome = session
		.pull_one(PullTarget::Name("Pricing".into()), OverwritePolicy::Ask, &NoCallbacks)
		.await
		.unwrap();

	assert_eq!(
		outcome,
		PullOutcome::Pulled { record_id: ids[0].clone(), path: "src/Pricing.ts".into(), written: true }
	);
	assert!(!session.workspace().exists(Path::new("src/Other.ts")).await);
}

#[tokio::test]
async fn test_pull_one_logs_its_own_outcome() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let ids = seed(&session, &["Pricing"]);
	let target = || PullTarget::Name("Pricing".into());

	session.pull_one(target(), OverwritePolicy::Ask, &NoCallbacks).await.unwrap();
	session.workspace().write(Path::new("src/Pricing.ts"), "// edited\n").await.unwrap();
	let outcome = session.pull_one(target(), OverwritePolicy::Skip, &NoCallbacks).await.unwrap();
	assert!(matches!(outcome, PullOutcome::Skipped { .. }));

	let entries = session.activity().entries().await.unwrap();
	let outcomes: Vec<&str> = entries.iter().map(|e| e.outcome.as_str()).collect();
	assert_eq!(outcomes, vec!["succeeded", "skipped"]);
	for entry in &entries {
		assert_eq!(entry.action, Action::Pull);
		assert_eq!(entry.file, "src/Pricing.ts");
		assert_eq!(entry.record_id.as_deref(), Some(ids[0].as_str()));
	}
}

#[tokio::test]
async fn test_pull_by_missing_name() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	seed(&session, &["Other"]);

	let err = session
		.pull_one(PullTarget::Name("Pricing".into()), OverwritePolicy::Ask, &NoCallbacks)
		.await
		.unwrap_err();
	assert!(matches!(err, SyncError::NoRecordNamed { ref name } if name == "Pricing"));
}

#[tokio::test]
async fn test_pull_by_ambiguous_name() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	for id in ["a1", "a2"] {
		session.transport().insert_record(ScriptRecord {
			id: id.to_string(),
			name: "Dup".to_string(),
			..Default::default()
		});
	}

	let err = session
		.pull_one(PullTarget::Name("Dup".into()), OverwritePolicy::Ask, &NoCallbacks)
		.await
		.unwrap_err();

	match err {
		SyncError::AmbiguousName { ids, .. } => {
			assert_eq!(ids, vec!["a1".to_string(), "a2".to_string()])
		}
		other => panic!("unexpected error: {}", other),
	}
	assert!(session.config().files.is_empty());
}

#[tokio::test]
async fn test_pull_file_prefers_its_link() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let ids = seed(&session, &["A"]);
	session.pull_all(OverwritePolicy::Ask, &CancelToken::new(), &NoCallbacks).await.unwrap();

	session.transport().edit(&ids[0], "// edited\n");
	let outcome = session
		.pull_one(PullTarget::File("src/A.ts".into()), OverwritePolicy::Overwrite, &NoCallbacks)
		.await
		.unwrap();

	assert!(matches!(outcome, PullOutcome::Pulled { written: true, .. }));
	assert_eq!(read(&session, "src/A.ts").await, "// edited\n");
}

// ============================================================================
// Overwrite answers and cancellation
// ============================================================================

#[tokio::test]
async fn test_skip_all_at_second_file() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	let names = ["A", "B", "C", "D", "E"];
	seed(&session, &names);
	for name in names {
		session
			.workspace()
			.write(Path::new(&format!("src/{}.ts", name)), "// local\n")
			.await
			.unwrap();
	}

	let asked = Arc::new(AtomicUsize::new(0));
	let counter = asked.clone();
	let callbacks = CallbackBuilder::new()
		.on_conflict(move |_| match counter.fetch_add(1, Ordering::SeqCst) {
			0 => OverwriteChoice::Overwrite,
			_ => OverwriteChoice::SkipAll,
		})
		.build();

	let report = session
		.pull_all(OverwritePolicy::Ask, &CancelToken::new(), callbacks.as_ref())
		.await
		.unwrap();

	assert_eq!(asked.load(Ordering::SeqCst), 2);
	assert_eq!(report.succeeded(), 1);
	assert_eq!(report.skipped(), 4);
	assert_eq!(read(&session, "src/A.ts").await, "// A remote\n");
	for name in ["B", "C", "D", "E"] {
		assert_eq!(read(&session, &format!("src/{}.ts", name)).await, "// local\n");
	}
}

#[tokio::test]
async fn test_backup_all_keeps_local_copies() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	seed(&session, &["A", "B"]);
	for name in ["A", "B"] {
		session
			.workspace()
			.write(Path::new(&format!("src/{}.ts", name)), &format!("// {} local\n", name))
			.await
			.unwrap();
	}

	let callbacks = CallbackBuilder::new().on_conflict(|_| OverwriteChoice::BackupAll).build();
	let report = session
		.pull_all(OverwritePolicy::Ask, &CancelToken::new(), callbacks.as_ref())
		.await
		.unwrap();
	assert_eq!(report.succeeded(), 2);

	let mut dirs = tokio::fs::read_dir(session.workspace().backups_dir()).await.unwrap();
	let backup = dirs.next_entry().await.unwrap().unwrap().path();
	assert!(dirs.next_entry().await.unwrap().is_none(), "one directory per batch");
	for name in ["A", "B"] {
		let saved = tokio::fs::read_to_string(backup.join(format!("{}.ts", name))).await.unwrap();
		assert_eq!(saved, format!("// {} local\n", name));
	}
}

#[tokio::test]
async fn test_cancel_between_items() {
	let dir = TempDir::new().unwrap();
	let mut session = new_session(&dir).await;
	seed(&session, &["A", "B", "C", "D", "E"]);

	let cancel = CancelToken::new();
	let token = cancel.clone();
	let callbacks = CallbackBuilder::new()
		.on_progress(move |event| {
			// Stop once the third item has been started
			if event.completed == 2 {
				token.cancel();
			}
		})
		.build();

	let report = session.pull_all(OverwritePolicy::Ask, &cancel, callbacks.as_ref()).await.unwrap();

	assert_eq!(report.succeeded(), 3);
	assert_eq!(report.not_attempted(), 2);
	assert!(session.workspace().exists(Path::new("src/C.ts")).await);
	assert!(!session.workspace().exists(Path::new("src/D.ts")).await);

	// Only attempted items are logged
	let entries = session.activity().entries().await.unwrap();
	assert_eq!(entries.len(), 3);
	assert!(entries.iter().all(|e| e.action == Action::Pull && e.outcome == "succeeded"));
}

// vim: ts=4
