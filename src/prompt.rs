//! Interactive overwrite prompts on the terminal

use std::io::{BufRead, Write};
use std::sync::Mutex;

use crate::callbacks::{ProgressEvent, SyncCallbacks};
use crate::conflict::Conflict;
use crate::error::SyncError;
use crate::logging::*;
use crate::progress::CliProgress;
use crate::strategies::OverwriteChoice;
use crate::sync::report::ItemReport;

/// Terminal callbacks: progress on stderr, overwrite questions on stdin
pub struct CliPrompter<R: BufRead + Send> {
	progress: CliProgress,
	input: Mutex<R>,
}

impl CliPrompter<std::io::BufReader<std::io::Stdin>> {
	pub fn stdin(label: &str) -> Self {
		Self::new(label, std::io::BufReader::new(std::io::stdin()))
	}
}

impl<R: BufRead + Send> CliPrompter<R> {
	pub fn new(label: &str, input: R) -> Self {
		CliPrompter { progress: CliProgress::new(label), input: Mutex::new(input) }
	}

	/// Ask until a valid answer is read; end of input cancels
	fn ask(&self, conflict: &Conflict) -> OverwriteChoice {
		self.progress.clear();
		let options: Vec<String> = OverwriteChoice::ALL
			.iter()
			.map(|c| format!("[{}] {}", c.shortcut(), c.label()))
			.collect();

		let mut input = self.input.lock().unwrap_or_else(|e| e.into_inner());
		loop {
			let mut stderr = std::io::stderr();
			let _ = writeln!(stderr, "{}", conflict.message());
			let _ = write!(stderr, "  {} ? ", options.join("  "));
			let _ = stderr.flush();

			let mut line = String::new();
			match input.read_line(&mut line) {
				Ok(0) | Err(_) => {
					warn!("No answer on standard input, cancelling");
					return OverwriteChoice::Cancel;
				}
				Ok(_) => {}
			}
			match line.trim().parse::<OverwriteChoice>() {
				Ok(choice) => return choice,
				Err(e) => {
					let _ = writeln!(stderr, "{}", e);
				}
			}
		}
	}
}

impl<R: BufRead + Send> SyncCallbacks for CliPrompter<R> {
	fn on_progress(&self, event: ProgressEvent) {
		self.progress.render(&event);
	}

	fn on_conflict(&self, conflict: &Conflict) -> OverwriteChoice {
		self.ask(conflict)
	}

	fn on_error(&self, item: &str, error: &SyncError) {
		debug!("{} failed: {:?}", item, error);
	}

	fn on_item(&self, report: &ItemReport) {
		self.progress.finish_item(report);
	}
}


// vim: ts=4
