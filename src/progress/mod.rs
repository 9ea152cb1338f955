//! Progress display for CLI batches
//!
//! Renders one status line on stderr that is rewritten before every item, and
//! replaces it with a log line once the item is finished.

pub mod constants;

use std::io::{IsTerminal, Write};
use std::sync::Mutex;

use crate::callbacks::ProgressEvent;
use crate::logging::*;
use crate::sync::report::{ItemReport, ItemStatus};

/// Progress display constants
pub use constants::*;

/// CLI progress display
pub struct CliProgress {
	label: String,
	interactive: bool,
	drawn: Mutex<bool>,
}

impl CliProgress {
	/// Create a progress display; `label` prefixes the bar ("Pushing", "Pulling")
	pub fn new(label: &str) -> Self {
		Self {
			label: label.to_string(),
			interactive: std::io::stderr().is_terminal(),
			drawn: Mutex::new(false),
		}
	}

	/// Draw the bar for the item about to be processed
	pub fn render(&self, event: &ProgressEvent) {
		if !self.interactive {
			debug!("{} {}/{}: {}", self.label, event.completed + 1, event.total, event.current_item);
			return;
		}
		let line = format_bar(&self.label, event);
		let mut stderr = std::io::stderr();
		let _ = write!(stderr, "{}{}", CLEAR_LINE, line);
		let _ = stderr.flush();
		*self.drawn.lock().unwrap_or_else(|e| e.into_inner()) = true;
	}

	/// Clear the bar and log the item's outcome
	pub fn finish_item(&self, report: &ItemReport) {
		self.clear();
		match &report.status {
			ItemStatus::Succeeded => info!("✓ {}", report.item),
			ItemStatus::SkippedByPolicy => info!("- {} (skipped)", report.item),
			ItemStatus::Failed(e) => warn!("✗ {}: {}", report.item, e),
			ItemStatus::NotAttempted => debug!("  {} (not attempted)", report.item),
		}
	}

	/// Remove the bar, if one is on screen
	pub fn clear(&self) {
		let mut drawn = self.drawn.lock().unwrap_or_else(|e| e.into_inner());
		if *drawn {
			let mut stderr = std::io::stderr();
			let _ = write!(stderr, "{}", CLEAR_LINE);
			let _ = stderr.flush();
			*drawn = false;
		}
	}
}

/// Progress line: `Pushing [=====     ] 2/4 src/A.ts`
pub fn format_bar(label: &str, event: &ProgressEvent) -> String {
	let ratio = if event.total > 0 { event.completed as f64 / event.total as f64 } else { 0.0 };
	let filled = (ratio.clamp(0.0, 1.0) * PROGRESS_BAR_WIDTH as f64) as usize;
	format!(
		"  {}: [{}{}] {}/{} {}",
		label,
		"=".repeat(filled),
		" ".repeat(PROGRESS_BAR_WIDTH - filled),
		event.completed,
		event.total,
		shorten(&event.current_item, ITEM_LABEL_WIDTH)
	)
}

fn shorten(item: &str, width: usize) -> String {
	let count = item.chars().count();
	if count <= width {
		return item.to_string();
	}
	let tail: String = item.chars().skip(count - (width - 1)).collect();
	format!("…{}", tail)
}


// vim: ts=4
