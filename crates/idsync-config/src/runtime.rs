// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use idsync_common_http::RetryConfig;
use idsync_common_secret::CredentialRef;
use idsync_core::http::DEFAULT_TIMEOUT;
use idsync_core::ProviderKind;
use url::Url;

use crate::layer::{ConfigLayer, LoggingLayer, ProviderLayer, RetryLayer, SyncLayer};
use crate::ConfigError;

pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// The final configuration, with every default filled in.
#[derive(Debug, Clone)]
pub struct IdsyncConfig {
	pub logging: LoggingConfig,
	pub retry: RetryConfig,
	pub sync: SyncConfig,
	pub providers: BTreeMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	#[default]
	Pretty,
	Compact,
	Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
	pub source: Option<String>,
	pub targets: Vec<String>,
	pub call_timeout: Duration,
	pub run_timeout: Option<Duration>,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			source: None,
			targets: Vec::new(),
			call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
			run_timeout: None,
		}
	}
}

/// One `[providers.<name>]` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
	pub name: String,
	pub kind: ProviderKind,
	pub base_url: Option<Url>,
	pub credential: Option<CredentialRef>,
	pub allow_delete: bool,
	pub require_mfa: bool,
	pub prune_attributes: bool,
	/// Per-request timeout for HTTP providers.
	pub timeout: Duration,
	pub fixture: Option<String>,
}

impl ProviderConfig {
	pub fn is_http(&self) -> bool {
		!matches!(self.kind, ProviderKind::Memory)
	}
}

impl IdsyncConfig {
	pub fn from_layer(layer: ConfigLayer) -> Result<Self, ConfigError> {
		Ok(Self {
			logging: build_logging_config(layer.logging)?,
			retry: build_retry_config(layer.retry),
			sync: build_sync_config(layer.sync),
			providers: build_providers_config(layer.providers.map(|p| p.entries).unwrap_or_default())?,
		})
	}

	pub fn provider(&self, name: &str) -> Result<&ProviderConfig, ConfigError> {
		self
			.providers
			.get(name)
			.ok_or_else(|| ConfigError::ProviderNotFound(name.to_string()))
	}
}

fn build_logging_config(layer: Option<LoggingLayer>) -> Result<LoggingConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(LoggingConfig {
		level: match layer.level.as_deref() {
			None => LogLevel::default(),
			Some(level) => parse_log_level(level)?,
		},
		format: match layer.format.as_deref() {
			None => LogFormat::default(),
			Some(format) => parse_log_format(format)?,
		},
	})
}

pub fn parse_log_level(s: &str) -> Result<LogLevel, ConfigError> {
	match s.trim().to_ascii_lowercase().as_str() {
		"error" => Ok(LogLevel::Error),
		"warn" | "warning" => Ok(LogLevel::Warn),
		"info" => Ok(LogLevel::Info),
		"debug" => Ok(LogLevel::Debug),
		"trace" => Ok(LogLevel::Trace),
		other => Err(ConfigError::invalid_value(
			"logging.level",
			format!("unknown level '{other}' (expected error, warn, info, debug or trace)"),
		)),
	}
}

fn parse_log_format(s: &str) -> Result<LogFormat, ConfigError> {
	match s.trim().to_ascii_lowercase().as_str() {
		"pretty" => Ok(LogFormat::Pretty),
		"compact" => Ok(LogFormat::Compact),
		"json" => Ok(LogFormat::Json),
		other => Err(ConfigError::invalid_value(
			"logging.format",
			format!("unknown format '{other}' (expected pretty, compact or json)"),
		)),
	}
}

fn build_retry_config(layer: Option<RetryLayer>) -> RetryConfig {
	let layer = layer.unwrap_or_default();
	let defaults = RetryConfig::default();
	RetryConfig {
		max_attempts: layer.max_attempts.unwrap_or(defaults.max_attempts),
		base_delay: layer
			.base_delay_ms
			.map(Duration::from_millis)
			.unwrap_or(defaults.base_delay),
		max_delay: layer
			.max_delay_ms
			.map(Duration::from_millis)
			.unwrap_or(defaults.max_delay),
		backoff_factor: layer.backoff_factor.unwrap_or(defaults.backoff_factor),
		jitter: layer.jitter.unwrap_or(defaults.jitter),
	}
}

fn build_sync_config(layer: Option<SyncLayer>) -> SyncConfig {
	let layer = layer.unwrap_or_default();
	SyncConfig {
		source: layer.source,
		targets: layer.targets.unwrap_or_default(),
		call_timeout: Duration::from_secs(layer.call_timeout_secs.unwrap_or(DEFAULT_CALL_TIMEOUT_SECS)),
		run_timeout: layer.run_timeout_secs.map(Duration::from_secs),
	}
}

fn build_providers_config(
	entries: impl IntoIterator<Item = (String, ProviderLayer)>,
) -> Result<BTreeMap<String, ProviderConfig>, ConfigError> {
	entries
		.into_iter()
		.map(|(name, layer)| {
			let provider = build_provider_config(&name, layer)?;
			Ok((name, provider))
		})
		.collect()
}

fn build_provider_config(name: &str, layer: ProviderLayer) -> Result<ProviderConfig, ConfigError> {
	let kind = layer
		.kind
		.ok_or_else(|| ConfigError::missing_field(format!("providers.{name}.kind")))?;

	let base_url = layer
		.base_url
		.map(|raw| {
			Url::parse(&raw).map_err(|e| {
				ConfigError::invalid_value(format!("providers.{name}.base_url"), format!("'{raw}': {e}"))
			})
		})
		.transpose()?;

	let credential = layer
		.credential
		.map(|raw| {
			raw.parse::<CredentialRef>().map_err(|source| ConfigError::Credential {
				provider: name.to_string(),
				source,
			})
		})
		.transpose()?;

	Ok(ProviderConfig {
		name: name.to_string(),
		kind,
		base_url,
		credential,
		allow_delete: layer.allow_delete.unwrap_or(false),
		require_mfa: layer.require_mfa.unwrap_or(false),
		prune_attributes: layer.prune_attributes.unwrap_or(false),
		timeout: layer
			.timeout_secs
			.map(Duration::from_secs)
			.unwrap_or(DEFAULT_TIMEOUT),
		fixture: layer.fixture,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn from_toml(s: &str) -> Result<IdsyncConfig, ConfigError> {
		IdsyncConfig::from_layer(toml::from_str(s).unwrap())
	}

	#[test]
	fn empty_layer_gets_defaults() {
		let config = IdsyncConfig::from_layer(ConfigLayer::default()).unwrap();
		assert_eq!(config.logging, LoggingConfig::default());
		assert_eq!(config.retry, RetryConfig::default());
		assert_eq!(config.sync, SyncConfig::default());
		assert!(config.providers.is_empty());
	}

	#[test]
	fn provider_defaults_are_conservative() {
		let config = from_toml(
			r#"
			[providers.entra]
			kind = "directory"
			base_url = "https://graph.example.com/v1.0"
			credential = "env:ENTRA_TOKEN"
			"#,
		)
		.unwrap();

		let entra = config.provider("entra").unwrap();
		assert_eq!(entra.kind, ProviderKind::Directory);
		assert_eq!(entra.credential, Some(CredentialRef::Env("ENTRA_TOKEN".to_string())));
		assert!(!entra.allow_delete);
		assert!(!entra.require_mfa);
		assert_eq!(entra.timeout, DEFAULT_TIMEOUT);
		assert!(entra.is_http());
	}

	#[test]
	fn missing_kind_is_reported_with_path() {
		let err = from_toml("[providers.entra]\nbase_url = \"https://x\"\n").unwrap_err();
		assert!(matches!(err, ConfigError::MissingField(ref f) if f == "providers.entra.kind"));
	}

	#[test]
	fn bad_credential_reference_is_rejected() {
		let err = from_toml("[providers.entra]\nkind = \"directory\"\ncredential = \"hunter2\"\n")
			.unwrap_err();
		assert!(matches!(err, ConfigError::Credential { ref provider, .. } if provider == "entra"));
	}

	#[test]
	fn unknown_log_format_is_rejected() {
		let err = from_toml("[logging]\nformat = \"xml\"\n").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "logging.format"));
	}

	#[test]
	fn retry_and_timeouts_convert_units() {
		let config = from_toml(
			r#"
			[retry]
			max_attempts = 5
			base_delay_ms = 50
			jitter = false

			[sync]
			call_timeout_secs = 10
			run_timeout_secs = 600
			"#,
		)
		.unwrap();

		assert_eq!(config.retry.max_attempts, 5);
		assert_eq!(config.retry.base_delay, Duration::from_millis(50));
		assert_eq!(config.retry.max_delay, RetryConfig::default().max_delay);
		assert!(!config.retry.jitter);
		assert_eq!(config.sync.call_timeout, Duration::from_secs(10));
		assert_eq!(config.sync.run_timeout, Some(Duration::from_secs(600)));
	}
}
