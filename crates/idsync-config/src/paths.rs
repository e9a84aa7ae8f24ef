// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Config file locations.

use std::path::PathBuf;

use crate::ConfigError;

const SYSTEM_CONFIG_FILE: &str = "/etc/idsync/config.toml";
const WORKSPACE_CONFIG_FILE: &str = ".idsync/config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
	/// `$XDG_CONFIG_HOME/idsync/config.toml`
	pub user_config_file: PathBuf,
	/// `/etc/idsync/config.toml`
	pub system_config_file: PathBuf,
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			user_config_file: PathBuf::from("~/.config/idsync/config.toml"),
			system_config_file: PathBuf::from(SYSTEM_CONFIG_FILE),
		}
	}
}

/// Resolves config paths, honouring `XDG_CONFIG_HOME`.
pub fn resolve_paths() -> Result<PathsConfig, ConfigError> {
	let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
		Some(dir) if !dir.is_empty() => PathBuf::from(dir),
		_ => dirs::home_dir()
			.ok_or(ConfigError::HomeDirNotFound)?
			.join(".config"),
	};

	tracing::debug!(config_home = %config_home.display(), "resolved config paths");

	Ok(PathsConfig {
		user_config_file: config_home.join("idsync/config.toml"),
		system_config_file: PathBuf::from(SYSTEM_CONFIG_FILE),
	})
}

/// `./.idsync/config.toml` relative to the current directory.
pub fn workspace_config_path() -> Result<PathBuf, ConfigError> {
	let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
		path: PathBuf::from("."),
		source,
	})?;
	Ok(cwd.join(WORKSPACE_CONFIG_FILE))
}
