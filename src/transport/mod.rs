//! Remote transport interface
//!
//! The engines depend only on [`ScriptTransport`], never on a concrete client.
//! [`salesforce::SalesforceTransport`] talks to a real org;
//! [`memory::MemoryTransport`] keeps records in memory for tests and offline use.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::{RecordPatch, ScriptRecord};

pub mod memory;
pub mod query;
pub mod salesforce;

pub use memory::MemoryTransport;
pub use query::ScriptQuery;
pub use salesforce::SalesforceTransport;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Rows and total size returned by a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
	/// Matching row count (the only meaningful field for `count()` queries)
	pub total_size: usize,

	pub records: Vec<ScriptRecord>,
}

/// Operations the sync core needs from the remote side
#[async_trait]
pub trait ScriptTransport: Send + Sync {
	/// Run a query and return every matching row
	async fn query(&self, query: &ScriptQuery) -> TransportResult<QueryResult>;

	/// Create a record, returning its new id
	async fn create(&self, patch: &RecordPatch) -> TransportResult<String>;

	/// Apply a partial update to a record
	async fn update(&self, id: &str, patch: &RecordPatch) -> TransportResult<()>;

	/// Fetch one record by id; `None` when it does not exist
	async fn retrieve(&self, id: &str) -> TransportResult<Option<ScriptRecord>>;

	/// Verify that the configured credentials work
	async fn check(&self) -> TransportResult<()> {
		self.query(&ScriptQuery::All { with_code: false }).await.map(|_| ())
	}
}

#[async_trait]
impl<T: ScriptTransport + ?Sized> ScriptTransport for Box<T> {
	async fn query(&self, query: &ScriptQuery) -> TransportResult<QueryResult> {
		(**self).query(query).await
	}

	async fn create(&self, patch: &RecordPatch) -> TransportResult<String> {
		(**self).create(patch).await
	}

	async fn update(&self, id: &str, patch: &RecordPatch) -> TransportResult<()> {
		(**self).update(id, patch).await
	}

	async fn retrieve(&self, id: &str) -> TransportResult<Option<ScriptRecord>> {
		(**self).retrieve(id).await
	}

	async fn check(&self) -> TransportResult<()> {
		(**self).check().await
	}
}

// vim: ts=4
