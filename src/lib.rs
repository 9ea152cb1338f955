//! # qcpsync - Salesforce CPQ custom script sync
//!
//! qcpsync keeps Salesforce CPQ custom script records (`SBQQ__CustomScript__c`)
//! and local script files in a workspace in sync: pull records to files, push
//! file edits back, compare either side and take timestamped backups.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qcpsync::callbacks::NoCallbacks;
//! use qcpsync::settings::Settings;
//! use qcpsync::strategies::OverwritePolicy;
//! use qcpsync::sync::SyncSession;
//! use qcpsync::transport::SalesforceTransport;
//! use qcpsync::utils::CancelToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let root = std::path::Path::new(".");
//!     let settings = Settings::load(root)?;
//!     let config = qcpsync::config::ConfigStore::new(
//!         qcpsync::workspace::Workspace::new(root, &settings.source_dir),
//!     )
//!     .load()
//!     .await?;
//!     let transport = SalesforceTransport::new(
//!         config.org_info.clone(),
//!         &settings.api_version,
//!         std::time::Duration::from_secs(settings.request_timeout_secs),
//!     )?;
//!     let mut session = SyncSession::load(transport, root, settings).await?;
//!     let report = session
//!         .pull_all(OverwritePolicy::Skip, &CancelToken::new(), &NoCallbacks)
//!         .await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod callbacks;
pub mod config;
pub mod conflict;
pub mod error;
pub mod logging;
pub mod mapper;
pub mod progress;
pub mod prompt;
pub mod settings;
pub mod strategies;
pub mod sync;
pub mod transport;
pub mod types;
pub mod utils;
pub mod workspace;

// Re-export commonly used types and functions
pub use config::SyncConfig;
pub use error::{SyncError, TransportError};
pub use strategies::{OverwriteChoice, OverwritePolicy};
pub use sync::{BatchReport, SyncSession};
pub use types::{LocalFileEntry, Lookup, OrgInfo, ScriptRecord};

// vim: ts=4
