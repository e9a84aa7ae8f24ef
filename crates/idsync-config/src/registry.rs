// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration registry that merges sources by precedence.

use tracing::{debug, info};

use crate::layer::ConfigLayer;
use crate::runtime::IdsyncConfig;
use crate::sources::ConfigSource;
use crate::validation::validate_config;
use crate::ConfigError;

#[derive(Default)]
pub struct ConfigRegistry {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, source: Box<dyn ConfigSource>) {
		debug!(source = source.name(), precedence = ?source.precedence(), "registering config source");
		self.sources.push(source);
	}

	/// Merges every source, lowest precedence first, then builds and
	/// validates the runtime config.
	///
	/// A source that fails to load fails the whole load: a broken file or
	/// environment variable is never silently ignored.
	pub fn load(&self) -> Result<IdsyncConfig, ConfigError> {
		let mut sorted: Vec<_> = self.sources.iter().collect();
		sorted.sort_by_key(|s| s.precedence());

		let mut merged = ConfigLayer::default();
		for source in sorted {
			debug!(source = source.name(), "merging config layer");
			merged.merge(source.load()?);
		}

		let config = IdsyncConfig::from_layer(merged)?;
		validate_config(&config)?;

		info!(
			provider_count = config.providers.len(),
			source = ?config.sync.source,
			targets = ?config.sync.targets,
			log_level = %config.logging.level,
			"configuration loaded"
		);

		Ok(config)
	}

	pub fn source_count(&self) -> usize {
		self.sources.len()
	}
}
