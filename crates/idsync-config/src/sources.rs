// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources and their precedence.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::layer::{ConfigLayer, LoggingLayer, RetryLayer, SyncLayer};
use crate::paths::{workspace_config_path, PathsConfig};
use crate::ConfigError;

const ENV_PREFIX: &str = "IDSYNC_";

/// Higher values override lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
	Defaults = 10,
	SystemFile = 20,
	UserFile = 30,
	WorkspaceFile = 40,
	ExplicitFile = 45,
	Environment = 50,
	Cli = 60,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;

	fn precedence(&self) -> Precedence;

	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults live in [`crate::runtime`]; this layer only anchors the
/// bottom of the stack.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		Ok(ConfigLayer::default())
	}
}

/// A TOML config file. Missing files yield an empty layer unless the file
/// was named explicitly.
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
	required: bool,
}

impl FileSource {
	pub fn system(paths: &PathsConfig) -> Self {
		Self::custom(paths.system_config_file.clone(), Precedence::SystemFile, "system")
	}

	pub fn user(paths: &PathsConfig) -> Self {
		Self::custom(paths.user_config_file.clone(), Precedence::UserFile, "user")
	}

	pub fn workspace() -> Result<Self, ConfigError> {
		Ok(Self::custom(
			workspace_config_path()?,
			Precedence::WorkspaceFile,
			"workspace",
		))
	}

	/// The file passed with `--config`. It must exist.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			required: true,
			..Self::custom(path, Precedence::ExplicitFile, "explicit")
		}
	}

	pub fn custom(path: PathBuf, precedence: Precedence, name: &'static str) -> Self {
		Self {
			path,
			precedence,
			name,
			required: false,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}

	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			if self.required {
				return Err(ConfigError::FileNotFound(self.path.clone()));
			}
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
			path: self.path.clone(),
			source,
		})?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// `IDSYNC_*` environment variables.
pub struct EnvSource {
	vars: Vec<(String, String)>,
}

impl EnvSource {
	/// Snapshot of the process environment.
	pub fn from_process() -> Self {
		Self::from_vars(std::env::vars())
	}

	pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			vars: vars
				.into_iter()
				.filter(|(key, _)| key.starts_with(ENV_PREFIX))
				.collect(),
		}
	}
}

fn parse_env<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError>
where
	T::Err: std::fmt::Display,
{
	value
		.trim()
		.parse()
		.map_err(|e: T::Err| ConfigError::env(var, format!("cannot parse '{value}': {e}")))
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		let mut layer = ConfigLayer::default();

		for (key, value) in &self.vars {
			let Some(name) = key.strip_prefix(ENV_PREFIX) else {
				continue;
			};
			match name {
				"LOG_LEVEL" => {
					layer.logging.get_or_insert_with(LoggingLayer::default).level = Some(value.clone());
				}
				"LOG_FORMAT" => {
					layer.logging.get_or_insert_with(LoggingLayer::default).format = Some(value.clone());
				}
				"SOURCE" => {
					layer.sync.get_or_insert_with(SyncLayer::default).source = Some(value.clone());
				}
				"TARGETS" => {
					let targets = value
						.split(',')
						.map(str::trim)
						.filter(|t| !t.is_empty())
						.map(str::to_string)
						.collect();
					layer.sync.get_or_insert_with(SyncLayer::default).targets = Some(targets);
				}
				"CALL_TIMEOUT_SECS" => {
					layer.sync.get_or_insert_with(SyncLayer::default).call_timeout_secs =
						Some(parse_env(key, value)?);
				}
				"RUN_TIMEOUT_SECS" => {
					layer.sync.get_or_insert_with(SyncLayer::default).run_timeout_secs =
						Some(parse_env(key, value)?);
				}
				"RETRY_MAX_ATTEMPTS" => {
					layer.retry.get_or_insert_with(RetryLayer::default).max_attempts =
						Some(parse_env(key, value)?);
				}
				_ => {
					trace!(var = %key, "ignoring unrecognised environment variable");
					continue;
				}
			}
			debug!(var = %key, "applied environment override");
		}

		Ok(layer)
	}
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub config_file: Option<PathBuf>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub source: Option<String>,
	pub targets: Option<Vec<String>>,
	pub run_timeout_secs: Option<u64>,
}

pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();
		let o = &self.overrides;

		if let Some(ref level) = o.log_level {
			layer.logging.get_or_insert_with(LoggingLayer::default).level = Some(level.clone());
		}
		if let Some(ref format) = o.log_format {
			layer.logging.get_or_insert_with(LoggingLayer::default).format = Some(format.clone());
		}
		if let Some(ref source) = o.source {
			layer.sync.get_or_insert_with(SyncLayer::default).source = Some(source.clone());
		}
		if let Some(ref targets) = o.targets {
			if !targets.is_empty() {
				layer.sync.get_or_insert_with(SyncLayer::default).targets = Some(targets.clone());
			}
		}
		if let Some(secs) = o.run_timeout_secs {
			layer.sync.get_or_insert_with(SyncLayer::default).run_timeout_secs = Some(secs);
		}

		Ok(layer)
	}
}
