// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for idsync.
//!
//! Layers, lowest precedence first:
//! - built-in defaults
//! - `/etc/idsync/config.toml`
//! - `$XDG_CONFIG_HOME/idsync/config.toml`
//! - `./.idsync/config.toml`
//! - the file passed with `--config`
//! - `IDSYNC_*` environment variables
//! - command-line flags

pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::{
	IdsyncConfig, LogFormat, LogLevel, LoggingConfig, ProviderConfig, SyncConfig,
	DEFAULT_CALL_TIMEOUT_SECS,
};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Loads configuration from every standard source plus CLI overrides.
pub fn load_config(cli: CliOverrides) -> Result<IdsyncConfig, ConfigError> {
	let paths = paths::resolve_paths()?;

	let mut registry = ConfigRegistry::new();
	registry.register(Box::new(sources::DefaultsSource));
	registry.register(Box::new(sources::FileSource::system(&paths)));
	registry.register(Box::new(sources::FileSource::user(&paths)));
	registry.register(Box::new(sources::FileSource::workspace()?));
	if let Some(ref path) = cli.config_file {
		registry.register(Box::new(sources::FileSource::explicit(path.clone())));
	}
	registry.register(Box::new(sources::EnvSource::from_process()));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load()
}
