//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Pulled {}", name);
//! warn!("Skipped {}", path);
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// Logs at INFO level and above by default. Control the level with `RUST_LOG`:
///
/// ```bash
/// RUST_LOG=debug qcpsync pull --all
/// RUST_LOG=qcpsync::transport=debug qcpsync push src/Pricing.ts
/// ```
pub fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

// vim: ts=4
