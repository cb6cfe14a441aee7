//! modlink command line.
//!
//! Loads the named units, with their dependency graphs, from a directory of
//! manifests and prints the exports as JSON on stdout. Logs go to stderr.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use modlink_loader::{Loader, UnitSnapshot};
use modlink_transport::{ConfigError, DirTransport, TransportConfig};
use serde::Serialize;
use serde_json::Value;
use tokio::task::LocalSet;
use tracing::{debug, info};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "modlink.toml";

/// modlink command line arguments.
#[derive(Parser, Debug)]
#[command(name = "modlink")]
#[command(about = "Load unit manifests and everything they depend on")]
struct Args {
	/// Transport config file
	#[arg(short, long, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Directory unit names are resolved against
	#[arg(short, long, value_name = "DIR")]
	base_dir: Option<PathBuf>,

	/// Simulated latency per fetch, in milliseconds
	#[arg(long, value_name = "MS")]
	delay_ms: Option<u64>,

	/// Print the unit graph instead of the exports
	#[arg(short, long)]
	graph: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,

	/// Units to load
	#[arg(required = true, value_name = "NAME")]
	names: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let args = Args::parse();

	setup_tracing(args.verbose);

	match LocalSet::new().run_until(run(args)).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(error) => {
			for line in error_chain(error.as_ref()) {
				eprintln!("{line}");
			}
			ExitCode::FAILURE
		}
	}
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
	let config = resolve_config(&args)?;
	info!(base_dir = %config.base_dir.display(), units = args.names.len(), "starting modlink");

	let loader = Loader::new(DirTransport::new(config));
	let outcome = loader.load(args.names.iter().map(String::as_str)).await;
	debug!(ok = outcome.is_ok(), "load finished");

	if args.graph {
		let snapshot = loader.snapshot();
		let graph = snapshot.iter().map(GraphEntry::from).collect::<Vec<_>>();
		println!("{}", serde_json::to_string_pretty(&graph)?);
		outcome?;
	} else {
		println!("{}", serde_json::to_string_pretty(&Value::Array(outcome?))?);
	}
	Ok(())
}

/// Builds the transport config: file first, then flag overrides.
fn resolve_config(args: &Args) -> Result<TransportConfig, ConfigError> {
	let mut config = match &args.config {
		Some(path) => TransportConfig::load(path)?,
		None if Path::new(DEFAULT_CONFIG).is_file() => TransportConfig::load(DEFAULT_CONFIG)?,
		None => TransportConfig::default(),
	};
	if let Some(base_dir) = &args.base_dir {
		config.base_dir = base_dir.clone();
	}
	if let Some(delay_ms) = args.delay_ms {
		config.delay_ms = delay_ms;
	}
	Ok(config)
}

/// `error: ...` followed by one `caused by: ...` line per source.
fn error_chain(error: &dyn Error) -> Vec<String> {
	let mut lines = vec![format!("error: {error}")];
	let mut source = error.source();
	while let Some(cause) = source {
		lines.push(format!("  caused by: {cause}"));
		source = cause.source();
	}
	lines
}

#[derive(Debug, Serialize)]
struct GraphEntry<'a> {
	name: &'a str,
	status: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	dependencies: Option<Vec<&'a str>>,
	#[serde(skip_serializing_if = "is_zero")]
	pending: usize,
}

fn is_zero(count: &usize) -> bool {
	*count == 0
}

impl<'a> From<&'a UnitSnapshot> for GraphEntry<'a> {
	fn from(unit: &'a UnitSnapshot) -> Self {
		Self {
			name: unit.name.as_str(),
			status: unit.status.as_str(),
			dependencies: unit.dependencies.as_ref().map(|deps| deps.iter().map(|dep| dep.as_str()).collect()),
			pending: unit.pending,
		}
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("MODLINK_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("modlink=debug,modlink_loader=debug,modlink_transport=debug,warn")
			} else {
				EnvFilter::new("warn")
			}
		});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

#[cfg(test)]
mod tests {
	use modlink_loader::LoadError;
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn flags_override_the_config_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("custom.toml");
		std::fs::write(&path, "base_dir = 'units'\ndelay_ms = 10\n").unwrap();

		let args = Args::try_parse_from(["modlink", "--config", path.to_str().unwrap(), "--delay-ms", "3", "app"]).unwrap();
		let config = resolve_config(&args).unwrap();
		assert_eq!(config.base_dir, dir.path().join("units"));
		assert_eq!(config.delay_ms, 3);

		let args = Args::try_parse_from(["modlink", "-c", path.to_str().unwrap(), "-b", "/elsewhere", "app"]).unwrap();
		assert_eq!(resolve_config(&args).unwrap().base_dir, PathBuf::from("/elsewhere"));
	}

	#[test]
	fn names_are_required() {
		assert!(Args::try_parse_from(["modlink"]).is_err());
		let args = Args::try_parse_from(["modlink", "--graph", "a", "b"]).unwrap();
		assert!(args.graph);
		assert_eq!(args.names, vec!["a", "b"]);
	}

	#[test]
	fn error_chain_walks_dependency_failures() {
		let error = LoadError::DependencyFailed {
			name: "app".into(),
			dependency: "lib".into(),
			source: Box::new(LoadError::FetchFailure {
				name: "lib".into(),
				reason: "not found".into(),
			}),
		};
		assert_eq!(
			error_chain(&error),
			vec![
				"error: `app` depends on `lib`, which failed".to_string(),
				"  caused by: failed to fetch `lib`: not found".to_string(),
			]
		);
	}
}
