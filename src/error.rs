//! Error types for qcpsync operations

use std::error::Error;
use std::fmt;
use std::io;

/// Main error type for sync operations
#[derive(Debug)]
pub enum SyncError {
	/// Querying remote records failed
	RemoteQuery { message: String },

	/// Creating or updating a remote record failed (`id` is None on create)
	RemoteWrite { id: Option<String>, message: String },

	/// A linked record id no longer exists remotely
	RecordNotFound { id: String },

	/// No remote record carries the name derived from a file
	NoRecordNamed { name: String },

	/// More than one remote record carries the same name
	AmbiguousName { name: String, ids: Vec<String> },

	/// Records with different names would be pulled into the same file
	FileClash { path: String, ids: Vec<String> },

	/// A record referenced by a comparison does not exist
	RemoteRecordNotFound { id: String },

	/// Config or log could not be read or written
	Persistence { path: String, source: Box<dyn Error + Send + Sync> },

	/// Batch stopped before this item was attempted
	Cancelled,

	/// File has no linked record in the config
	NotLinked { path: String },

	/// Invalid configuration
	InvalidConfig { message: String },

	/// I/O error
	Io(io::Error),

	/// Transport error (nested)
	Transport(TransportError),

	/// Generic error message
	Other { message: String },
}

impl SyncError {
	/// Wrap a transport failure that happened while reading
	pub fn query(e: TransportError) -> Self {
		SyncError::RemoteQuery { message: e.to_string() }
	}

	/// Wrap a transport failure that happened while writing
	pub fn write(id: Option<&str>, e: TransportError) -> Self {
		SyncError::RemoteWrite { id: id.map(str::to_string), message: e.to_string() }
	}

	pub fn persistence<E>(path: &std::path::Path, source: E) -> Self
	where
		E: Into<Box<dyn Error + Send + Sync>>,
	{
		SyncError::Persistence { path: path.display().to_string(), source: source.into() }
	}

	/// True for the "not attempted" status
	pub fn is_cancelled(&self) -> bool {
		matches!(self, SyncError::Cancelled)
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::RemoteQuery { message } => {
				write!(f, "Error querying Salesforce: {}", message)
			}
			SyncError::RemoteWrite { id: Some(id), message } => {
				write!(f, "Error saving record {} to Salesforce: {}", id, message)
			}
			SyncError::RemoteWrite { id: None, message } => {
				write!(f, "Error creating record on Salesforce: {}", message)
			}
			SyncError::RecordNotFound { id } => {
				write!(f, "Linked record {} no longer exists on Salesforce", id)
			}
			SyncError::NoRecordNamed { name } => {
				write!(f, "Could not find a record on Salesforce named \"{}\".", name)
			}
			SyncError::AmbiguousName { name, ids } => write!(
				f,
				"There are multiple records on Salesforce named \"{}\" ({}), you should rename or delete these duplicate records from Salesforce and locally.",
				name,
				ids.join(", ")
			),
			SyncError::FileClash { path, ids } => write!(
				f,
				"Records {} would all be pulled into {}, rename them on Salesforce so their file names differ.",
				ids.join(", "),
				path
			),
			SyncError::RemoteRecordNotFound { id } => {
				write!(f, "Could not find record on salesforce with Id {}.", id)
			}
			SyncError::Persistence { path, source } => {
				write!(f, "Failed to persist {}: {}", path, source)
			}
			SyncError::Cancelled => write!(f, "Operation cancelled before this item"),
			SyncError::NotLinked { path } => {
				write!(f, "{} is not linked to a Salesforce record", path)
			}
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Transport(e) => write!(f, "Transport error: {}", e),
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<String> for SyncError {
	fn from(e: String) -> Self {
		SyncError::Other { message: e }
	}
}

impl From<TransportError> for SyncError {
	fn from(e: TransportError) -> Self {
		SyncError::Transport(e)
	}
}

/// Transport-level errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
	/// Login rejected or session could not be established
	LoginFailed { message: String },

	/// Request could not be sent (DNS, TLS, timeout...)
	Request { message: String },

	/// Non-success HTTP status
	Http { status: u16, body: String },

	/// Response body had an unexpected shape
	Decode { message: String },

	/// Salesforce accepted the call but reported errors
	Rejected { message: String },
}

impl fmt::Display for TransportError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransportError::LoginFailed { message } => write!(f, "Login failed: {}", message),
			TransportError::Request { message } => write!(f, "Request failed: {}", message),
			TransportError::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
			TransportError::Decode { message } => {
				write!(f, "Unexpected response format: {}", message)
			}
			TransportError::Rejected { message } => write!(f, "Rejected: {}", message),
		}
	}
}

impl Error for TransportError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ambiguous_name_lists_all_ids() {
		let err = SyncError::AmbiguousName {
			name: "Foo".to_string(),
			ids: vec!["a1".to_string(), "a2".to_string()],
		};
		let msg = err.to_string();
		assert!(msg.contains("\"Foo\""));
		assert!(msg.contains("a1, a2"));
	}

	#[test]
	fn test_write_error_mentions_id() {
		let err = SyncError::write(Some("a9"), TransportError::Http { status: 400, body: "bad".into() });
		assert_eq!(err.to_string(), "Error saving record a9 to Salesforce: HTTP 400: bad");

		let err = SyncError::write(None, TransportError::Rejected { message: "dup".into() });
		assert!(err.to_string().starts_with("Error creating record"));
	}

	#[test]
	fn test_cancelled_flag() {
		assert!(SyncError::Cancelled.is_cancelled());
		assert!(!SyncError::RecordNotFound { id: "x".into() }.is_cancelled());
	}
}

// vim: ts=4
