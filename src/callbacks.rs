//! Callback traits for progress reporting and event handling

use crate::conflict::Conflict;
use crate::error::SyncError;
use crate::strategies::OverwriteChoice;
use crate::sync::report::ItemReport;

// Type aliases to reduce complexity
type ProgressFn = dyn Fn(ProgressEvent) + Send + Sync;
type ConflictFn = dyn Fn(&Conflict) -> OverwriteChoice + Send + Sync;
type ErrorFn = dyn Fn(&str, &SyncError) + Send + Sync;
type ItemFn = dyn Fn(&ItemReport) + Send + Sync;

/// Progress of a batch, emitted before each item is processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
	/// Items finished so far
	pub completed: usize,

	/// Items in the batch
	pub total: usize,

	/// Item about to be processed
	pub current_item: String,
}

/// Combined callback handler for all events
pub trait SyncCallbacks: Send + Sync {
	/// Called before each batch item
	fn on_progress(&self, _event: ProgressEvent) {}

	/// Called when an overwrite needs a decision; the default never overwrites
	fn on_conflict(&self, _conflict: &Conflict) -> OverwriteChoice {
		OverwriteChoice::Skip
	}

	/// Called when an item fails
	fn on_error(&self, _item: &str, _error: &SyncError) {}

	/// Called when an item is finished, whatever its outcome
	fn on_item(&self, _report: &ItemReport) {}
}

/// Default callback implementation that does nothing
pub struct NoCallbacks;

impl SyncCallbacks for NoCallbacks {}

/// Builder for callbacks using function closures
pub struct CallbackBuilder {
	progress: Option<Box<ProgressFn>>,
	conflict: Option<Box<ConflictFn>>,
	error: Option<Box<ErrorFn>>,
	item: Option<Box<ItemFn>>,
}

impl CallbackBuilder {
	/// Create a new callback builder
	pub fn new() -> Self {
		CallbackBuilder { progress: None, conflict: None, error: None, item: None }
	}

	/// Set progress callback
	pub fn on_progress<F>(mut self, callback: F) -> Self
	where
		F: Fn(ProgressEvent) + Send + Sync + 'static,
	{
		self.progress = Some(Box::new(callback));
		self
	}

	/// Set conflict callback
	pub fn on_conflict<F>(mut self, callback: F) -> Self
	where
		F: Fn(&Conflict) -> OverwriteChoice + Send + Sync + 'static,
	{
		self.conflict = Some(Box::new(callback));
		self
	}

	/// Set error callback
	pub fn on_error<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str, &SyncError) + Send + Sync + 'static,
	{
		self.error = Some(Box::new(callback));
		self
	}

	/// Set item callback
	pub fn on_item<F>(mut self, callback: F) -> Self
	where
		F: Fn(&ItemReport) + Send + Sync + 'static,
	{
		self.item = Some(Box::new(callback));
		self
	}

	/// Build the callbacks handler
	pub fn build(self) -> Box<dyn SyncCallbacks> {
		Box::new(CompositeCallbacks {
			progress: self.progress,
			conflict: self.conflict,
			error: self.error,
			item: self.item,
		})
	}
}

impl Default for CallbackBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Internal composite callbacks implementation
struct CompositeCallbacks {
	progress: Option<Box<ProgressFn>>,
	conflict: Option<Box<ConflictFn>>,
	error: Option<Box<ErrorFn>>,
	item: Option<Box<ItemFn>>,
}

impl SyncCallbacks for CompositeCallbacks {
	fn on_progress(&self, event: ProgressEvent) {
		if let Some(ref callback) = self.progress {
			callback(event);
		}
	}

	fn on_conflict(&self, conflict: &Conflict) -> OverwriteChoice {
		match self.conflict {
			Some(ref callback) => callback(conflict),
			None => OverwriteChoice::Skip,
		}
	}

	fn on_error(&self, item: &str, error: &SyncError) {
		if let Some(ref callback) = self.error {
			callback(item, error);
		}
	}

	fn on_item(&self, report: &ItemReport) {
		if let Some(ref callback) = self.item {
			callback(report);
		}
	}
}


// vim: ts=4
