//! Salesforce REST transport
//!
//! Logs in through the SOAP partner endpoint with username, password and
//! security token (the flow that needs no connected app), then talks to the
//! REST `query` and `sobjects` endpoints with the returned session id. An
//! expired session (HTTP 401) triggers one re-login and retry.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

use super::query::OBJECT_NAME;
use super::{QueryResult, ScriptQuery, ScriptTransport, TransportResult};
use crate::error::TransportError;
use crate::logging::*;
use crate::types::{OrgInfo, RecordPatch, ScriptRecord};

/// Longest response body quoted in an error message
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone)]
struct Session {
	instance_url: String,
	session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
	total_size: usize,
	#[serde(default)]
	next_records_url: Option<String>,
	#[serde(default)]
	records: Vec<ScriptRecord>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
	id: String,
	success: bool,
	#[serde(default)]
	errors: Vec<serde_json::Value>,
}

/// Transport backed by a real Salesforce org
pub struct SalesforceTransport {
	client: reqwest::Client,
	org: OrgInfo,
	api_version: String,
	session: Mutex<Option<Session>>,
}

impl SalesforceTransport {
	/// Create a transport; no network traffic happens until the first call
	pub fn new(org: OrgInfo, api_version: &str, timeout: Duration) -> TransportResult<Self> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| TransportError::Request { message: e.to_string() })?;
		Ok(SalesforceTransport {
			client,
			org,
			api_version: api_version.to_string(),
			session: Mutex::new(None),
		})
	}

	/// Log in and cache the session
	pub async fn login(&self) -> TransportResult<()> {
		let session = self.soap_login().await?;
		*self.session.lock().await = Some(session);
		Ok(())
	}

	async fn soap_login(&self) -> TransportResult<Session> {
		let url = format!(
			"{}/services/Soap/u/{}",
			self.org.login_url.trim_end_matches('/'),
			self.api_version
		);
		debug!("Logging in to {} as {}", url, self.org.username);

		let body = login_envelope(
			&self.org.username,
			&format!("{}{}", self.org.password, self.org.api_token),
		);
		let response = self
			.client
			.post(&url)
			.header("Content-Type", "text/xml; charset=UTF-8")
			.header("SOAPAction", "login")
			.body(body)
			.send()
			.await
			.map_err(|e| request_error(e, &url))?;

		let status = response.status();
		let text = response.text().await.map_err(|e| request_error(e, &url))?;
		let reply = parse_login_reply(&text);
		if !status.is_success() {
			let message = reply.ok().and_then(|r| r.fault).unwrap_or_else(|| truncate(&text));
			return Err(TransportError::LoginFailed { message });
		}

		let reply = reply?;
		if let Some(fault) = reply.fault {
			return Err(TransportError::LoginFailed { message: fault });
		}
		let session_id = reply.session_id.ok_or_else(|| TransportError::Decode {
			message: "login response has no sessionId".to_string(),
		})?;
		let server_url = reply.server_url.ok_or_else(|| TransportError::Decode {
			message: "login response has no serverUrl".to_string(),
		})?;

		Ok(Session { instance_url: instance_url(&server_url), session_id })
	}

	async fn current_session(&self) -> TransportResult<Session> {
		let mut guard = self.session.lock().await;
		if let Some(ref session) = *guard {
			return Ok(session.clone());
		}
		let session = self.soap_login().await?;
		*guard = Some(session.clone());
		Ok(session)
	}

	fn data_url(&self, session: &Session) -> String {
		format!("{}/services/data/v{}", session.instance_url, self.api_version)
	}

	/// Send an authorized request built from `path`, re-logging in once on 401
	async fn send(
		&self,
		method: Method,
		path: &str,
		query: Option<&str>,
		json: Option<&RecordPatch>,
	) -> TransportResult<(StatusCode, String)> {
		let mut retried = false;
		loop {
			let session = self.current_session().await?;
			let url = if path.starts_with("/services/") {
				format!("{}{}", session.instance_url, path)
			} else {
				format!("{}{}", self.data_url(&session), path)
			};
			debug!("{} {}", method, url);

			let mut request = self
				.client
				.request(method.clone(), &url)
				.bearer_auth(&session.session_id)
				.header("Accept", "application/json");
			if let Some(q) = query {
				request = request.query(&[("q", q)]);
			}
			if let Some(body) = json {
				request = request.json(body);
			}

			let response = request.send().await.map_err(|e| request_error(e, &url))?;
			let status = response.status();
			let text = response.text().await.map_err(|e| request_error(e, &url))?;

			if status == StatusCode::UNAUTHORIZED && !retried {
				debug!("Session expired, logging in again");
				*self.session.lock().await = None;
				retried = true;
				continue;
			}
			return Ok((status, text));
		}
	}
}

#[async_trait]
impl ScriptTransport for SalesforceTransport {
	async fn query(&self, query: &ScriptQuery) -> TransportResult<QueryResult> {
		let soql = query.to_soql();
		let (status, text) = self.send(Method::GET, "/query", Some(&soql), None).await?;
		let mut page = parse_page(status, &text)?;

		let total_size = page.total_size;
		let mut records = std::mem::take(&mut page.records);
		while let Some(next) = page.next_records_url.take() {
			let (status, text) = self.send(Method::GET, &next, None, None).await?;
			page = parse_page(status, &text)?;
			records.append(&mut page.records);
		}
		Ok(QueryResult { total_size, records })
	}

	async fn create(&self, patch: &RecordPatch) -> TransportResult<String> {
		let path = format!("/sobjects/{}", OBJECT_NAME);
		let (status, text) = self.send(Method::POST, &path, None, Some(patch)).await?;
		if !status.is_success() {
			return Err(TransportError::Http { status: status.as_u16(), body: truncate(&text) });
		}
		let created: CreateResponse = serde_json::from_str(&text)
			.map_err(|e| TransportError::Decode { message: e.to_string() })?;
		if !created.success {
			return Err(TransportError::Rejected {
				message: serde_json::Value::Array(created.errors).to_string(),
			});
		}
		Ok(created.id)
	}

	async fn update(&self, id: &str, patch: &RecordPatch) -> TransportResult<()> {
		let path = format!("/sobjects/{}/{}", OBJECT_NAME, id);
		let (status, text) = self.send(Method::PATCH, &path, None, Some(patch)).await?;
		if !status.is_success() {
			return Err(TransportError::Http { status: status.as_u16(), body: truncate(&text) });
		}
		Ok(())
	}

	async fn retrieve(&self, id: &str) -> TransportResult<Option<ScriptRecord>> {
		// A query rather than GET /sobjects/{id}: only queries return the
		// CreatedBy/LastModifiedBy relationship fields.
		let result = self.query(&ScriptQuery::ById(id.to_string())).await?;
		Ok(result.records.into_iter().next())
	}

	async fn check(&self) -> TransportResult<()> {
		self.login().await
	}
}

fn parse_page(status: StatusCode, text: &str) -> TransportResult<QueryPage> {
	if !status.is_success() {
		return Err(TransportError::Http { status: status.as_u16(), body: truncate(text) });
	}
	serde_json::from_str(text).map_err(|e| TransportError::Decode { message: e.to_string() })
}

fn request_error(e: reqwest::Error, url: &str) -> TransportError {
	let message = if e.is_timeout() {
		format!("{}: timeout - request took too long", url)
	} else if e.is_connect() {
		format!("{}: connection error - check network connectivity. Error: {}", url, e)
	} else if e.is_decode() {
		format!("{}: could not decode response. Error: {}", url, e)
	} else {
		format!("{}: {}", url, e)
	};
	TransportError::Request { message }
}

fn truncate(text: &str) -> String {
	if text.len() > MAX_ERROR_BODY {
		let mut end = MAX_ERROR_BODY;
		while !text.is_char_boundary(end) {
			end -= 1;
		}
		format!("{}... (truncated)", &text[..end])
	} else {
		text.to_string()
	}
}

fn login_envelope(username: &str, password: &str) -> String {
	format!(
		concat!(
			"<?xml version=\"1.0\" encoding=\"utf-8\" ?>",
			"<env:Envelope xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" ",
			"xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ",
			"xmlns:env=\"http://schemas.xmlsoap.org/soap/envelope/\">",
			"<env:Body><n1:login xmlns:n1=\"urn:partner.soap.sforce.com\">",
			"<n1:username>{}</n1:username><n1:password>{}</n1:password>",
			"</n1:login></env:Body></env:Envelope>"
		),
		quick_xml::escape::escape(username),
		quick_xml::escape::escape(password)
	)
}

/// Fields of a SOAP login response (or fault)
#[derive(Debug, Default, PartialEq, Eq)]
struct LoginReply {
	session_id: Option<String>,
	server_url: Option<String>,
	fault: Option<String>,
}

fn local_name(name: &[u8]) -> &[u8] {
	name.rsplit(|b| *b == b':').next().unwrap_or(name)
}

/// True when the innermost open elements are `tail`
fn ends_with(path: &[Vec<u8>], tail: &[&[u8]]) -> bool {
	path.len() >= tail.len()
		&& path[path.len() - tail.len()..].iter().zip(tail).all(|(a, b)| a.as_slice() == *b)
}

fn parse_login_reply(xml: &str) -> TransportResult<LoginReply> {
	let decode_error = |e: quick_xml::Error| TransportError::Decode { message: e.to_string() };
	let mut reader = Reader::from_reader(xml.as_bytes());
	reader.trim_text(true);

	let mut buf = Vec::new();
	let mut path: Vec<Vec<u8>> = Vec::new();
	let mut reply = LoginReply::default();
	loop {
		match reader.read_event_into(&mut buf) {
			Ok(Event::Start(e)) => {
				let qname = e.name();
				path.push(local_name(qname.as_ref()).to_vec());
			}
			Ok(Event::End(_)) => {
				path.pop();
			}
			Ok(Event::Text(e)) => {
				let text = e.unescape().map_err(decode_error)?.into_owned();
				if ends_with(&path, &[b"loginResponse", b"result", b"sessionId"]) {
					reply.session_id = Some(text);
				} else if ends_with(&path, &[b"loginResponse", b"result", b"serverUrl"]) {
					reply.server_url = Some(text);
				} else if ends_with(&path, &[b"Fault", b"faultstring"]) {
					reply.fault = Some(text);
				}
			}
			Ok(Event::Eof) => break,
			Err(e) => return Err(decode_error(e)),
			_ => {}
		}
		buf.clear();
	}
	Ok(reply)
}

/// `https://host/services/Soap/u/48.0/00D...` -> `https://host`
fn instance_url(server_url: &str) -> String {
	match server_url.find("://") {
		Some(scheme_end) => {
			let after = &server_url[scheme_end + 3..];
			let host_end = after.find('/').unwrap_or(after.len());
			server_url[..scheme_end + 3 + host_end].to_string()
		}
		None => server_url.to_string(),
	}
}


// vim: ts=4
