// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! idsync: keep downstream identity systems in line with a system of record.
//!
//! Reports go to stdout, logs to stderr. The exit code of `sync` and `demo`
//! is the number of operations that did not succeed (capped at 255).

mod commands;
mod demo;
mod output;
mod providers;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idsync_config::{load_config, CliOverrides, LogFormat, LoggingConfig};
use idsync_core::Identity;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "idsync", version, about, long_about = None)]
struct Args {
	/// Extra configuration file, applied above the standard locations
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long, global = true)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long, global = true)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Converge every target on the source
	Sync {
		/// Source provider (defaults to [sync] source)
		#[arg(long)]
		source: Option<String>,
		/// Target provider, repeatable (defaults to [sync] targets)
		#[arg(long = "target", short)]
		targets: Vec<String>,
		/// Stop the run after this many seconds
		#[arg(long, value_name = "SECS")]
		timeout: Option<u64>,
		/// Print the report as JSON
		#[arg(long)]
		json: bool,
	},
	/// Show what sync would do without changing anything
	Plan {
		#[arg(long)]
		source: Option<String>,
		#[arg(long = "target", short)]
		targets: Vec<String>,
		#[arg(long)]
		json: bool,
	},
	/// List a provider's identities
	Fetch {
		provider: String,
		#[arg(long)]
		json: bool,
	},
	/// Create one identity at a provider
	Provision {
		provider: String,
		#[arg(long)]
		id: String,
		#[arg(long)]
		name: String,
		/// Attribute, repeatable
		#[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_key_val)]
		attributes: Vec<(String, String)>,
		#[arg(long)]
		json: bool,
	},
	/// Remove one identity from a provider
	Deprovision {
		provider: String,
		#[arg(long)]
		id: String,
		#[arg(long)]
		json: bool,
	},
	/// Enforce MFA for one identity
	EnableMfa {
		provider: String,
		#[arg(long)]
		id: String,
		#[arg(long)]
		json: bool,
	},
	/// Run an offline walkthrough against in-memory providers
	Demo {
		#[arg(long)]
		json: bool,
	},
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
	match s.split_once('=') {
		Some((key, value)) if !key.trim().is_empty() => {
			Ok((key.trim().to_string(), value.to_string()))
		}
		_ => Err(format!("expected KEY=VALUE, got '{s}'")),
	}
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		let mut overrides = CliOverrides {
			config_file: args.config.clone(),
			log_level: args.log_level.clone(),
			log_format: args.json_logs.then(|| "json".to_string()),
			..Default::default()
		};
		match &args.command {
			Command::Sync {
				source,
				targets,
				timeout,
				..
			} => {
				overrides.source = source.clone();
				overrides.targets = Some(targets.clone());
				overrides.run_timeout_secs = *timeout;
			}
			Command::Plan { source, targets, .. } => {
				overrides.source = source.clone();
				overrides.targets = Some(targets.clone());
			}
			_ => {}
		}
		overrides
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("idsync={}", logging.level)));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
	let args = Args::parse();

	let config = load_config(CliOverrides::from(&args)).context("failed to load configuration")?;
	init_tracing(&config.logging);

	info!(version = env!("CARGO_PKG_VERSION"), "starting idsync");
	debug!(providers = ?config.providers.keys().collect::<Vec<_>>(), "configured providers");

	match args.command {
		Command::Sync { json, .. } => commands::sync(&config, json).await,
		Command::Plan { json, .. } => commands::plan(&config, json).await,
		Command::Fetch { provider, json } => commands::fetch(&config, &provider, json).await,
		Command::Provision {
			provider,
			id,
			name,
			attributes,
			json,
		} => {
			let identity = Identity::new(id, name).with_attributes(attributes);
			commands::provision(&config, &provider, identity, json).await
		}
		Command::Deprovision { provider, id, json } => {
			commands::deprovision(&config, &provider, &id, json).await
		}
		Command::EnableMfa { provider, id, json } => {
			commands::enable_mfa(&config, &provider, &id, json).await
		}
		Command::Demo { json } => demo::run(providers::orchestrator_config(&config), json).await,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		use clap::CommandFactory;
		Args::command().debug_assert();
	}

	#[test]
	fn sync_flags_become_overrides() {
		let args = Args::parse_from([
			"idsync",
			"--log-level",
			"debug",
			"--json-logs",
			"sync",
			"--source",
			"sailpoint",
			"-t",
			"entra",
			"--target",
			"jira",
			"--timeout",
			"60",
		]);
		let overrides = CliOverrides::from(&args);
		assert_eq!(overrides.log_level.as_deref(), Some("debug"));
		assert_eq!(overrides.log_format.as_deref(), Some("json"));
		assert_eq!(overrides.source.as_deref(), Some("sailpoint"));
		assert_eq!(
			overrides.targets,
			Some(vec!["entra".to_string(), "jira".to_string()])
		);
		assert_eq!(overrides.run_timeout_secs, Some(60));
	}

	#[test]
	fn attributes_parse_as_pairs() {
		let args = Args::parse_from([
			"idsync",
			"provision",
			"sailpoint",
			"--id",
			"103",
			"--name",
			"Jane Doe",
			"--attr",
			"role=Manager",
			"--attr",
			"department=Ops=East",
		]);
		match args.command {
			Command::Provision { attributes, .. } => assert_eq!(
				attributes,
				vec![
					("role".to_string(), "Manager".to_string()),
					("department".to_string(), "Ops=East".to_string()),
				]
			),
			other => panic!("unexpected command {other:?}"),
		}
	}

	#[test]
	fn attribute_without_equals_is_rejected() {
		assert!(parse_key_val("role").is_err());
		assert!(parse_key_val("=x").is_err());
	}
}
