use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use qcpsync::activity::ActivityLog;
use qcpsync::config::ConfigStore;
use qcpsync::logging::{self, *};
use qcpsync::prompt::CliPrompter;
use qcpsync::settings::Settings;
use qcpsync::strategies::OverwritePolicy;
use qcpsync::sync::{BatchReport, CompareResult, PullOutcome, PullTarget, SyncSession};
use qcpsync::transport::{MemoryTransport, SalesforceTransport, ScriptTransport};
use qcpsync::types::{OrgInfo, OrgType};
use qcpsync::utils::{setup_signal_handlers, CancelToken};
use qcpsync::workspace::Workspace;

type Session = SyncSession<Box<dyn ScriptTransport>>;

///////////////////////
// Utility functions //
///////////////////////

/// Command line path resolved against the current directory
///
/// Symlinks are resolved when the path (or its parent directory) exists, so
/// files and the workspace root compare on the same form.
fn absolute(path: &str) -> Result<PathBuf, Box<dyn Error>> {
	let path = std::env::current_dir()?.join(path);
	if let Ok(canonical) = std::fs::canonicalize(&path) {
		return Ok(canonical);
	}
	let parent = path.parent().and_then(|p| std::fs::canonicalize(p).ok());
	Ok(match (parent, path.file_name()) {
		(Some(parent), Some(name)) => parent.join(name),
		_ => path,
	})
}

/// Settings with the CLI flags applied on top
fn load_settings(matches: &ArgMatches, root: &Path) -> Result<Settings, Box<dyn Error>> {
	let mut settings = Settings::load(root)?;
	if let Some(policy) = matches.get_one::<String>("policy") {
		settings.overwrite = policy.parse::<OverwritePolicy>()?;
	}
	Ok(settings)
}

fn make_transport(
	org: &OrgInfo,
	settings: &Settings,
	offline: bool,
) -> Result<Box<dyn ScriptTransport>, Box<dyn Error>> {
	if offline {
		warn!("Offline mode: working against an empty in-memory org");
		return Ok(Box::new(MemoryTransport::new()));
	}
	let timeout = Duration::from_secs(settings.request_timeout_secs);
	Ok(Box::new(SalesforceTransport::new(org.clone(), &settings.api_version, timeout)?))
}

async fn open_session(
	root: &Path,
	settings: Settings,
	offline: bool,
) -> Result<Session, Box<dyn Error>> {
	let store = ConfigStore::new(Workspace::new(root, &settings.source_dir));
	let org = if store.exists().await { store.load().await?.org_info } else { OrgInfo::default() };
	let transport = make_transport(&org, &settings, offline)?;
	Ok(SyncSession::load(transport, root, settings).await?)
}

/// Org info for `init`: flags over the values already in the workspace
async fn init_org_info(
	matches: &ArgMatches,
	root: &Path,
	settings: &Settings,
) -> Result<OrgInfo, Box<dyn Error>> {
	let store = ConfigStore::new(Workspace::new(root, &settings.source_dir));
	let mut org = store.load_or_default().await?.org_info;

	if let Some(org_type) = matches.get_one::<String>("org-type") {
		let org_type = org_type.parse::<OrgType>()?;
		if let Some(url) = org_type.login_url() {
			org.login_url = url.to_string();
		}
		org.org_type = Some(org_type);
	}
	if let Some(url) = matches.get_one::<String>("login-url") {
		org.login_url = url.trim_end_matches('/').to_string();
	}
	if let Some(username) = matches.get_one::<String>("username") {
		org.username = username.clone();
	}
	if let Some(password) = matches.get_one::<String>("password") {
		org.password = password.clone();
	}
	if let Some(token) = matches.get_one::<String>("token") {
		org.api_token = token.clone();
	}
	if org.org_type == Some(OrgType::Custom) && matches.get_one::<String>("login-url").is_none() {
		return Err("--login-url is required for a custom org type".into());
	}
	Ok(org)
}

/// Print the summary and turn failed items into an error exit
fn finish(report: &BatchReport) -> Result<(), Box<dyn Error>> {
	for (item, error) in report.failures() {
		error!("{}: {}", item, error);
	}
	println!("{}", report.summary());
	if report.is_success() {
		Ok(())
	} else {
		Err(format!("{} item(s) failed", report.failed()).into())
	}
}

fn print_comparison(result: &CompareResult) {
	if result.identical {
		println!("{} and {} are identical", result.left, result.right);
	} else {
		print!("{}", result.unified);
		println!("{} insertion(s), {} deletion(s)", result.insertions, result.deletions);
	}
	for change in &result.field_changes {
		println!(
			"{}: {} -> {}",
			change.field,
			change.left.as_deref().unwrap_or("<empty>"),
			change.right.as_deref().unwrap_or("<empty>")
		);
	}
}

fn cli() -> Command {
	let file_arg = |name: &'static str| Arg::new(name).required(true).value_name("FILE");
	let id_arg = |name: &'static str| Arg::new(name).required(true).value_name("ID");

	Command::new("qcpsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Sync Salesforce CPQ custom scripts with local files")
		.subcommand_required(true)
		.arg(
			Arg::new("workspace")
				.short('w')
				.long("workspace")
				.value_name("DIR")
				.global(true)
				.help("Workspace root (defaults to the current directory)"),
		)
		.arg(
			Arg::new("policy")
				.short('p')
				.long("policy")
				.value_name("POLICY")
				.global(true)
				.help("When a write would replace different content: ask, overwrite, skip, backup"),
		)
		.arg(
			Arg::new("offline")
				.long("offline")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Use an empty in-memory org instead of Salesforce"),
		)
		.subcommand(
			Command::new("init")
				.about("Initialize the workspace and store the org connection")
				.arg(Arg::new("org-type").long("org-type").value_name("TYPE"))
				.arg(Arg::new("login-url").long("login-url").value_name("URL"))
				.arg(Arg::new("username").short('u').long("username").value_name("USERNAME"))
				.arg(Arg::new("password").long("password").value_name("PASSWORD"))
				.arg(Arg::new("token").long("token").value_name("TOKEN")),
		)
		.subcommand(Command::new("check").about("Test the org credentials"))
		.subcommand(
			Command::new("pull")
				.about("Pull records into local files")
				.arg(Arg::new("all").long("all").action(ArgAction::SetTrue))
				.arg(Arg::new("id").long("id").value_name("ID"))
				.arg(Arg::new("name").long("name").value_name("NAME"))
				.arg(
					Arg::new("list")
						.long("list")
						.action(ArgAction::SetTrue)
						.help("List remote records without pulling"),
				)
				.arg(Arg::new("file").value_name("FILE"))
				.group(
					clap::ArgGroup::new("target")
						.args(["all", "id", "name", "list", "file"])
						.required(true),
				),
		)
		.subcommand(
			Command::new("push")
				.about("Push local files to their records")
				.arg(Arg::new("all").long("all").action(ArgAction::SetTrue))
				.arg(Arg::new("files").value_name("FILE").action(ArgAction::Append).num_args(1..))
				.group(clap::ArgGroup::new("target").args(["all", "files"]).required(true)),
		)
		.subcommand(
			Command::new("diff")
				.about("Compare files and records")
				.subcommand_required(true)
				.subcommand(
					Command::new("linked")
						.about("A file against its linked record")
						.arg(file_arg("file")),
				)
				.subcommand(
					Command::new("remote")
						.about("A file against any record")
						.arg(file_arg("file"))
						.arg(id_arg("id")),
				)
				.subcommand(
					Command::new("local")
						.about("Two local files")
						.arg(file_arg("a"))
						.arg(file_arg("b")),
				)
				.subcommand(
					Command::new("records")
						.about("Two remote records")
						.arg(id_arg("a"))
						.arg(id_arg("b")),
				),
		)
		.subcommand(
			Command::new("backup")
				.about("Take a timestamped backup")
				.subcommand_required(true)
				.subcommand(Command::new("local").about("Copy every local script file"))
				.subcommand(Command::new("remote").about("Save the code of every remote record")),
		)
		.subcommand(
			Command::new("log").about("Show the activity log").arg(
				Arg::new("limit")
					.short('n')
					.long("limit")
					.value_name("N")
					.value_parser(clap::value_parser!(usize)),
			),
		)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	logging::init_tracing();
	let matches = cli().get_matches();

	let root = matches
		.get_one::<String>("workspace")
		.map(|dir| absolute(dir))
		.unwrap_or_else(|| absolute("."))?;
	let settings = load_settings(&matches, &root)?;
	let offline = matches.get_flag("offline");

	match matches.subcommand() {
		Some(("init", sub)) => {
			let org = init_org_info(sub, &root, &settings).await?;
			let transport = make_transport(&org, &settings, offline)?;
			let session = SyncSession::init(transport, &root, settings, org).await?;
			let org = &session.config().org_info;
			if org.has_credentials() {
				match session.check().await {
					Ok(()) => info!("Connected to {} as {}", org.login_url, org.username),
					Err(e) => warn!("Saved, but the credentials did not work: {}", e),
				}
			} else {
				info!("No credentials yet, run init again with --username and --password");
			}
		}
		Some(("check", _)) => {
			let session = open_session(&root, settings, offline).await?;
			session.check().await?;
			println!("Credentials OK");
		}
		Some(("pull", sub)) => {
			let mut session = open_session(&root, settings, offline).await?;
			let policy = session.settings().overwrite;
			let prompter = CliPrompter::stdin("Pulling");

			if sub.get_flag("list") {
				for record in session.list_remote().await? {
					println!("{}\t{}\t{}", record.id, record.name, record.detail());
				}
			} else if sub.get_flag("all") {
				let cancel = CancelToken::new();
				setup_signal_handlers(cancel.clone());
				let report = session.pull_all(policy, &cancel, &prompter).await?;
				finish(&report)?;
			} else {
				let target = if let Some(id) = sub.get_one::<String>("id") {
					PullTarget::RecordId(id.clone())
				} else if let Some(name) = sub.get_one::<String>("name") {
					PullTarget::Name(name.clone())
				} else {
					let file = sub.get_one::<String>("file").ok_or("pull: nothing to pull")?;
					PullTarget::File(absolute(file)?)
				};
				match session.pull_one(target, policy, &prompter).await? {
					PullOutcome::Pulled { path, written: true, .. } => println!("Pulled {}", path),
					PullOutcome::Pulled { path, written: false, .. } => {
						println!("{} is up to date", path)
					}
					PullOutcome::Skipped { path, .. } => println!("Kept local {}", path),
					PullOutcome::Cancelled => println!("Cancelled"),
				}
			}
		}
		Some(("push", sub)) => {
			let mut session = open_session(&root, settings, offline).await?;
			let policy = session.settings().overwrite;
			let prompter = CliPrompter::stdin("Pushing");
			let cancel = CancelToken::new();
			setup_signal_handlers(cancel.clone());

			let report = if sub.get_flag("all") {
				session.push_workspace(policy, &cancel, &prompter).await?
			} else {
				let files: Vec<PathBuf> = sub
					.get_many::<String>("files")
					.ok_or("push: at least one file argument required")?
					.map(|f| absolute(f))
					.collect::<Result<_, _>>()?;
				session.push_all(&files, policy, &cancel, &prompter).await
			};
			finish(&report)?;
		}
		Some(("diff", sub)) => {
			let session = open_session(&root, settings, offline).await?;
			let arg = |m: &ArgMatches, name: &str| -> Result<String, Box<dyn Error>> {
				Ok(m.get_one::<String>(name).ok_or(format!("diff: {} required", name))?.clone())
			};
			let result = match sub.subcommand() {
				Some(("linked", m)) => {
					session.compare_local_with_linked(&absolute(&arg(m, "file")?)?).await?
				}
				Some(("remote", m)) => {
					let file = arg(m, "file")?;
					session.compare_local_with_remote(&absolute(&file)?, &arg(m, "id")?).await?
				}
				Some(("local", m)) => {
					session
						.compare_local_files(&absolute(&arg(m, "a")?)?, &absolute(&arg(m, "b")?)?)
						.await?
				}
				Some(("records", m)) => {
					session.compare_remote_records(&arg(m, "a")?, &arg(m, "b")?).await?
				}
				_ => return Err("diff: unknown mode".into()),
			};
			print_comparison(&result);
		}
		Some(("backup", sub)) => {
			let session = open_session(&root, settings, offline).await?;
			let backup = match sub.subcommand_name() {
				Some("local") => session.backup_local().await?,
				Some("remote") => session.backup_remote().await?,
				_ => return Err("backup: unknown side".into()),
			};
			println!("Backup written to {}", backup.dir.display());
			finish(&backup.report)?;
		}
		Some(("log", sub)) => {
			let workspace = Workspace::new(&root, &settings.source_dir);
			let entries = ActivityLog::new(workspace, &settings).entries().await?;
			let limit = sub.get_one::<usize>("limit").copied().unwrap_or(entries.len());
			for entry in entries.iter().skip(entries.len().saturating_sub(limit)) {
				println!(
					"{}\t{}\t{}\t{}",
					entry.timestamp, entry.action, entry.file, entry.outcome
				);
			}
		}
		_ => {}
	}

	Ok(())
}

// vim: ts=4
