//! Query descriptions and their SOQL rendering

/// The one record type this tool manages
pub const OBJECT_NAME: &str = "SBQQ__CustomScript__c";

const FIELDS_BASE: &str = "Id, Name";
const FIELDS_USER: &str = concat!(
	"CreatedById, CreatedDate, LastModifiedById, LastModifiedDate, ",
	"CreatedBy.Id, CreatedBy.Name, CreatedBy.Username, ",
	"LastModifiedBy.Id, LastModifiedBy.Name, LastModifiedBy.Username"
);
const FIELDS_CODE: &str =
	"SBQQ__Code__c, SBQQ__GroupFields__c, SBQQ__QuoteFields__c, SBQQ__QuoteLineFields__c";

/// Every query the engines issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptQuery {
	/// All records, with or without code bodies
	All { with_code: bool },

	/// A single record by id (with code)
	ById(String),

	/// Records with an exact name
	ByName { name: String, with_code: bool },

	/// `count()` of records with an exact name
	CountByName(String),
}

impl ScriptQuery {
	/// Render the query as SOQL
	pub fn to_soql(&self) -> String {
		match self {
			ScriptQuery::All { with_code } => {
				format!("SELECT {} FROM {}", fields(*with_code), OBJECT_NAME)
			}
			ScriptQuery::ById(id) => format!(
				"SELECT {} FROM {} WHERE Id = '{}'",
				fields(true),
				OBJECT_NAME,
				escape_literal(id)
			),
			ScriptQuery::ByName { name, with_code } => format!(
				"SELECT {} FROM {} WHERE Name = '{}'",
				fields(*with_code),
				OBJECT_NAME,
				escape_literal(name)
			),
			ScriptQuery::CountByName(name) => {
				format!("SELECT count() FROM {} WHERE Name = '{}'", OBJECT_NAME, escape_literal(name))
			}
		}
	}

	/// True for `count()` queries, which return a size and no rows
	pub fn is_count(&self) -> bool {
		matches!(self, ScriptQuery::CountByName(_))
	}
}

fn fields(with_code: bool) -> String {
	if with_code {
		format!("{}, {}, {}", FIELDS_BASE, FIELDS_USER, FIELDS_CODE)
	} else {
		format!("{}, {}", FIELDS_BASE, FIELDS_USER)
	}
}

/// Escape a value for use inside a single-quoted SOQL string literal
fn escape_literal(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	for c in value.chars() {
		match c {
			'\\' => out.push_str("\\\\"),
			'\'' => out.push_str("\\'"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			_ => out.push(c),
		}
	}
	out
}


// vim: ts=4
