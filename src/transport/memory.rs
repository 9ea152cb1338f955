//! In-memory transport
//!
//! Simulates the remote org: records live in a map, ids and modification
//! dates are generated deterministically. Failures can be injected per record
//! name (or id) and for queries, and every served query is recorded so callers
//! can assert on what the engines asked for.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use super::{QueryResult, ScriptQuery, ScriptTransport, TransportResult};
use crate::error::TransportError;
use crate::types::{RecordPatch, ScriptRecord, UserRef};

const EPOCH_BASE: i64 = 1_700_000_000;

/// Remote org simulated in memory
pub struct MemoryTransport {
	records: Mutex<BTreeMap<String, ScriptRecord>>,
	clock: AtomicU64,
	queries: Mutex<Vec<ScriptQuery>>,
	failing_writes: Mutex<BTreeSet<String>>,
	fail_queries: AtomicBool,
	user: UserRef,
}

impl MemoryTransport {
	/// Create an empty org
	pub fn new() -> Self {
		MemoryTransport {
			records: Mutex::new(BTreeMap::new()),
			clock: AtomicU64::new(0),
			queries: Mutex::new(Vec::new()),
			failing_writes: Mutex::new(BTreeSet::new()),
			fail_queries: AtomicBool::new(false),
			user: UserRef {
				id: "005000000000001".to_string(),
				name: "Memory User".to_string(),
				username: "memory@example.com".to_string(),
			},
		}
	}

	/// Add a record and return its generated id
	pub fn insert(&self, name: &str, code: &str) -> String {
		let tick = self.tick();
		let id = format!("a0X{:012}", tick);
		let stamp = timestamp(tick);
		let record = ScriptRecord {
			id: id.clone(),
			name: name.to_string(),
			code: Some(code.to_string()),
			created_by: Some(self.user.clone()),
			created_date: Some(stamp.clone()),
			last_modified_by: Some(self.user.clone()),
			last_modified_date: Some(stamp),
			..Default::default()
		};
		self.lock_records().insert(id.clone(), record);
		id
	}

	/// Add a fully specified record (its id is kept as given)
	pub fn insert_record(&self, record: ScriptRecord) {
		self.lock_records().insert(record.id.clone(), record);
	}

	/// Change a record's code as another user would, bumping its modified date
	pub fn edit(&self, id: &str, code: &str) -> bool {
		let stamp = timestamp(self.tick());
		match self.lock_records().get_mut(id) {
			Some(record) => {
				record.code = Some(code.to_string());
				record.last_modified_date = Some(stamp);
				true
			}
			None => false,
		}
	}

	/// Delete a record
	pub fn remove(&self, id: &str) -> Option<ScriptRecord> {
		self.lock_records().remove(id)
	}

	/// Current state of a record
	pub fn get(&self, id: &str) -> Option<ScriptRecord> {
		self.lock_records().get(id).cloned()
	}

	/// All records, ordered by id
	pub fn records(&self) -> Vec<ScriptRecord> {
		self.lock_records().values().cloned().collect()
	}

	/// Make creates and updates of the given record name or id fail
	pub fn fail_writes_for(&self, name_or_id: &str) {
		self.failing_writes
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.insert(name_or_id.to_string());
	}

	/// Make every query fail (or succeed again)
	pub fn fail_queries(&self, fail: bool) {
		self.fail_queries.store(fail, Ordering::SeqCst);
	}

	/// Queries served so far, in order
	pub fn served_queries(&self) -> Vec<ScriptQuery> {
		self.queries.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	fn lock_records(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ScriptRecord>> {
		self.records.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn tick(&self) -> u64 {
		self.clock.fetch_add(1, Ordering::SeqCst) + 1
	}

	fn write_fails(&self, name: &str, id: Option<&str>) -> bool {
		let failing = self.failing_writes.lock().unwrap_or_else(|e| e.into_inner());
		failing.contains(name) || id.map(|id| failing.contains(id)).unwrap_or(false)
	}
}

impl Default for MemoryTransport {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ScriptTransport for MemoryTransport {
	async fn query(&self, query: &ScriptQuery) -> TransportResult<QueryResult> {
		self.queries.lock().unwrap_or_else(|e| e.into_inner()).push(query.clone());

		if self.fail_queries.load(Ordering::SeqCst) {
			return Err(TransportError::Request { message: "simulated query failure".to_string() });
		}

		let records = self.lock_records();
		let (matches, with_code): (Vec<&ScriptRecord>, bool) = match query {
			ScriptQuery::All { with_code } => (records.values().collect(), *with_code),
			ScriptQuery::ById(id) => (records.get(id).into_iter().collect(), true),
			ScriptQuery::ByName { name, with_code } => {
				(records.values().filter(|r| &r.name == name).collect(), *with_code)
			}
			ScriptQuery::CountByName(name) => {
				let count = records.values().filter(|r| &r.name == name).count();
				return Ok(QueryResult { total_size: count, records: vec![] });
			}
		};

		let rows: Vec<ScriptRecord> = matches
			.into_iter()
			.map(|r| if with_code { r.clone() } else { strip_code(r) })
			.collect();
		Ok(QueryResult { total_size: rows.len(), records: rows })
	}

	async fn create(&self, patch: &RecordPatch) -> TransportResult<String> {
		let name = patch.name.clone().ok_or_else(|| TransportError::Rejected {
			message: "REQUIRED_FIELD_MISSING: Name".to_string(),
		})?;
		if self.write_fails(&name, None) {
			return Err(TransportError::Http { status: 500, body: "simulated write failure".into() });
		}
		let id = self.insert(&name, patch.code.as_deref().unwrap_or(""));
		Ok(id)
	}

	async fn update(&self, id: &str, patch: &RecordPatch) -> TransportResult<()> {
		let stamp = timestamp(self.tick());
		let mut records = self.lock_records();
		let record = records.get_mut(id).ok_or_else(|| TransportError::Http {
			status: 404,
			body: format!("NOT_FOUND: {}", id),
		})?;
		if self.write_fails(&record.name, Some(id)) {
			return Err(TransportError::Http { status: 500, body: "simulated write failure".into() });
		}
		if let Some(ref name) = patch.name {
			record.name = name.clone();
		}
		if let Some(ref code) = patch.code {
			record.code = Some(code.clone());
		}
		record.last_modified_by = Some(self.user.clone());
		record.last_modified_date = Some(stamp);
		Ok(())
	}

	async fn retrieve(&self, id: &str) -> TransportResult<Option<ScriptRecord>> {
		if self.fail_queries.load(Ordering::SeqCst) {
			return Err(TransportError::Request { message: "simulated query failure".to_string() });
		}
		Ok(self.get(id))
	}

	async fn check(&self) -> TransportResult<()> {
		Ok(())
	}
}

fn strip_code(record: &ScriptRecord) -> ScriptRecord {
	ScriptRecord {
		code: None,
		group_fields: None,
		quote_fields: None,
		quote_line_fields: None,
		..record.clone()
	}
}

fn timestamp(tick: u64) -> String {
	chrono::DateTime::from_timestamp(EPOCH_BASE + tick as i64, 0)
		.map(|d| d.format("%Y-%m-%dT%H:%M:%S%.3f+0000").to_string())
		.unwrap_or_default()
}


// vim: ts=4
