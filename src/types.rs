//! Core data types shared by the mapper, engines and transports

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User reference embedded in audit fields (`CreatedBy`, `LastModifiedBy`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserRef {
	#[serde(rename = "Id", default)]
	pub id: String,

	#[serde(rename = "Name", default)]
	pub name: String,

	#[serde(rename = "Username", default)]
	pub username: String,
}

/// Remote custom script record (`SBQQ__CustomScript__c`)
///
/// Field names follow the Salesforce API so records deserialize straight from
/// query results. Code and field lists are absent on metadata-only queries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptRecord {
	#[serde(rename = "Id")]
	pub id: String,

	#[serde(rename = "Name")]
	pub name: String,

	#[serde(rename = "SBQQ__Code__c", default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,

	#[serde(rename = "SBQQ__GroupFields__c", default, skip_serializing_if = "Option::is_none")]
	pub group_fields: Option<String>,

	#[serde(rename = "SBQQ__QuoteFields__c", default, skip_serializing_if = "Option::is_none")]
	pub quote_fields: Option<String>,

	#[serde(
		rename = "SBQQ__QuoteLineFields__c",
		default,
		skip_serializing_if = "Option::is_none"
	)]
	pub quote_line_fields: Option<String>,

	#[serde(rename = "CreatedBy", default, skip_serializing_if = "Option::is_none")]
	pub created_by: Option<UserRef>,

	#[serde(rename = "CreatedDate", default, skip_serializing_if = "Option::is_none")]
	pub created_date: Option<String>,

	#[serde(rename = "LastModifiedBy", default, skip_serializing_if = "Option::is_none")]
	pub last_modified_by: Option<UserRef>,

	#[serde(rename = "LastModifiedDate", default, skip_serializing_if = "Option::is_none")]
	pub last_modified_date: Option<String>,
}

impl ScriptRecord {
	/// Username of whoever touched the record last
	pub fn modified_by(&self) -> &str {
		self.last_modified_by
			.as_ref()
			.or(self.created_by.as_ref())
			.map(|u| u.username.as_str())
			.unwrap_or("unknown")
	}

	/// One-line description used by listings and prompts
	pub fn detail(&self) -> String {
		let when = self
			.last_modified_date
			.as_deref()
			.or(self.created_date.as_deref())
			.map(|d| d.get(..19).unwrap_or(d))
			.unwrap_or("-");
		format!("Last Modified by {} at {}", self.modified_by(), when)
	}
}

/// Partial record sent on create or update
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordPatch {
	#[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,

	#[serde(rename = "SBQQ__Code__c", default, skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
}

/// A workspace file known to the config
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFileEntry {
	pub file_name: String,

	/// Path relative to the workspace root, always `/`-separated
	pub file_path: String,

	#[serde(default)]
	pub linked_record_id: Option<String>,

	/// Remote `LastModifiedDate` seen at the last pull or push
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub remote_modified_date: Option<String>,
}

impl LocalFileEntry {
	/// Entry linked to `record`, stamped with its modification date
	pub fn linked(file_name: &str, file_path: &str, record: &ScriptRecord) -> Self {
		LocalFileEntry {
			file_name: file_name.to_string(),
			file_path: file_path.to_string(),
			linked_record_id: Some(record.id.clone()),
			remote_modified_date: record.last_modified_date.clone(),
		}
	}

	pub fn is_linked(&self) -> bool {
		self.linked_record_id.is_some()
	}
}

/// Kind of org, used to pick a default login URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrgType {
	Sandbox,
	Developer,
	Production,
	#[serde(rename = "Custom URL")]
	Custom,
}

impl OrgType {
	/// Default login endpoint for this org type (None for custom domains)
	pub fn login_url(&self) -> Option<&'static str> {
		match self {
			OrgType::Sandbox => Some("https://test.salesforce.com"),
			OrgType::Developer | OrgType::Production => Some("https://login.salesforce.com"),
			OrgType::Custom => None,
		}
	}
}

impl FromStr for OrgType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"sandbox" | "test" => Ok(Self::Sandbox),
			"developer" | "dev" => Ok(Self::Developer),
			"production" | "prod" => Ok(Self::Production),
			"custom" | "custom url" => Ok(Self::Custom),
			_ => Err(format!(
				"Unknown org type: {}. Valid options: sandbox, developer, production, custom",
				s
			)),
		}
	}
}

impl std::fmt::Display for OrgType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Sandbox => write!(f, "Sandbox"),
			Self::Developer => write!(f, "Developer"),
			Self::Production => write!(f, "Production"),
			Self::Custom => write!(f, "Custom URL"),
		}
	}
}

/// Connection settings for the org
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrgInfo {
	pub login_url: String,
	pub username: String,
	pub password: String,
	pub api_token: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub org_type: Option<OrgType>,
}

impl Default for OrgInfo {
	fn default() -> Self {
		OrgInfo {
			login_url: "https://login.salesforce.com".to_string(),
			username: String::new(),
			password: String::new(),
			api_token: String::new(),
			org_type: None,
		}
	}
}

impl OrgInfo {
	/// True once a username and password have been entered
	pub fn has_credentials(&self) -> bool {
		!self.username.is_empty() && !self.password.is_empty()
	}
}

/// Result of looking a record up by name
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
	NotFound,
	Found(ScriptRecord),
	/// More than one record carries the name; all ids are listed
	Ambiguous(Vec<String>),
}

impl Lookup {
	pub fn is_found(&self) -> bool {
		matches!(self, Lookup::Found(_))
	}
}


// vim: ts=4
