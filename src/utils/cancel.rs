//! Batch cancellation and signal handling

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::logging::*;

/// Shared flag polled by batches between items
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
	cancelled: Arc<AtomicBool>,
}

impl CancelToken {
	pub fn new() -> Self {
		Self::default()
	}

	/// Request cancellation; items already finished are kept
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

/// Cancel `token` on the first SIGINT, exit on the second one or on SIGTERM
pub fn setup_signal_handlers(token: CancelToken) {
	tokio::spawn(async move {
		use tokio::signal;

		let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(stream) => stream,
			Err(e) => {
				warn!("Failed to setup SIGTERM handler: {}. Process will not handle SIGTERM gracefully.", e);
				return;
			}
		};

		let mut sigint = match signal::unix::signal(signal::unix::SignalKind::interrupt()) {
			Ok(stream) => stream,
			Err(e) => {
				warn!("Failed to setup SIGINT handler: {}. Process will not handle SIGINT gracefully.", e);
				return;
			}
		};

		loop {
			tokio::select! {
				_ = sigterm.recv() => {
					debug!("Received SIGTERM, exiting...");
					std::process::exit(143); // 128 + SIGTERM(15)
				}
				_ = sigint.recv() => {
					if token.is_cancelled() {
						debug!("Received second SIGINT, exiting...");
						std::process::exit(130); // 128 + SIGINT(2)
					}
					warn!("Cancelling after the current item (press Ctrl-C again to quit)");
					token.cancel();
				}
			}
		}
	});
}


// vim: ts=4
