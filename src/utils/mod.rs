//! Utility modules for common functionality

pub mod cancel;

// Re-export commonly used items
pub use cancel::{setup_signal_handlers, CancelToken};

// vim: ts=4
