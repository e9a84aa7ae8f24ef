// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use std::collections::HashSet;

use idsync_core::ProviderKind;
use tracing::warn;

use crate::runtime::{IdsyncConfig, ProviderConfig};
use crate::ConfigError;

/// Validate the configuration.
///
/// Hard errors stop the load; questionable but workable settings only warn.
pub fn validate_config(config: &IdsyncConfig) -> Result<(), ConfigError> {
	validate_retry(config)?;
	validate_timeouts(config)?;
	for provider in config.providers.values() {
		validate_provider(provider)?;
	}
	validate_sync(config)?;
	Ok(())
}

fn validate_retry(config: &IdsyncConfig) -> Result<(), ConfigError> {
	let retry = &config.retry;

	if retry.max_attempts == 0 {
		return Err(ConfigError::invalid_value("retry.max_attempts", "must be at least 1"));
	}
	if retry.max_attempts > 20 {
		return Err(ConfigError::invalid_value(
			"retry.max_attempts",
			"must be at most 20",
		));
	}
	if !(1.0..=10.0).contains(&retry.backoff_factor) {
		return Err(ConfigError::invalid_value(
			"retry.backoff_factor",
			"must be between 1.0 and 10.0",
		));
	}
	if retry.base_delay > retry.max_delay {
		return Err(ConfigError::invalid_value(
			"retry.base_delay_ms",
			"must not exceed max_delay_ms",
		));
	}
	Ok(())
}

fn validate_timeouts(config: &IdsyncConfig) -> Result<(), ConfigError> {
	if config.sync.call_timeout.is_zero() {
		return Err(ConfigError::invalid_value("sync.call_timeout_secs", "must be non-zero"));
	}
	if config.sync.run_timeout.is_some_and(|t| t.is_zero()) {
		return Err(ConfigError::invalid_value("sync.run_timeout_secs", "must be non-zero"));
	}
	Ok(())
}

fn validate_provider(provider: &ProviderConfig) -> Result<(), ConfigError> {
	let name = &provider.name;

	if provider.timeout.is_zero() {
		return Err(ConfigError::invalid_value(
			format!("providers.{name}.timeout_secs"),
			"must be non-zero",
		));
	}

	if provider.is_http() {
		let base_url = provider
			.base_url
			.as_ref()
			.ok_or_else(|| ConfigError::missing_field(format!("providers.{name}.base_url")))?;
		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigError::invalid_value(
				format!("providers.{name}.base_url"),
				format!("unsupported scheme '{}'", base_url.scheme()),
			));
		}
		if provider.credential.is_none() {
			return Err(ConfigError::missing_field(format!("providers.{name}.credential")));
		}
		if provider.fixture.is_some() {
			warn!(provider = %name, "fixture is only used by memory providers, ignoring");
		}
	} else if provider.base_url.is_some() || provider.credential.is_some() {
		warn!(provider = %name, "memory provider ignores base_url and credential");
	}

	if provider.require_mfa && matches!(provider.kind, ProviderKind::Governance | ProviderKind::Scim) {
		warn!(
			provider = %name,
			kind = %provider.kind,
			"require_mfa has no effect on a provider without MFA semantics"
		);
	}

	Ok(())
}

fn validate_sync(config: &IdsyncConfig) -> Result<(), ConfigError> {
	let sync = &config.sync;

	if let Some(source) = &sync.source {
		config.provider(source)?;
	}

	let mut seen = HashSet::new();
	for target in &sync.targets {
		config.provider(target)?;
		if sync.source.as_ref() == Some(target) {
			return Err(ConfigError::invalid_value(
				"sync.targets",
				format!("'{target}' is also the source"),
			));
		}
		if !seen.insert(target) {
			return Err(ConfigError::invalid_value(
				"sync.targets",
				format!("'{target}' is listed twice"),
			));
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn load(s: &str) -> Result<IdsyncConfig, ConfigError> {
		let config = IdsyncConfig::from_layer(toml::from_str(s).unwrap())?;
		validate_config(&config)?;
		Ok(config)
	}

	const PROVIDERS: &str = r#"
		[providers.sailpoint]
		kind = "governance"
		base_url = "https://iga.example.com/v3"
		credential = "env:SAILPOINT_TOKEN"

		[providers.entra]
		kind = "directory"
		base_url = "https://graph.example.com/v1.0"
		credential = "file:/run/secrets/entra"
		require_mfa = true

		[providers.scratch]
		kind = "memory"
		fixture = "empty"
	"#;

	#[test]
	fn valid_config_passes() {
		let config = load(&format!(
			"[sync]\nsource = \"sailpoint\"\ntargets = [\"entra\", \"scratch\"]\n{PROVIDERS}"
		))
		.unwrap();
		assert_eq!(config.sync.targets.len(), 2);
	}

	#[test]
	fn http_provider_needs_base_url() {
		let err = load("[providers.x]\nkind = \"scim\"\ncredential = \"env:X\"\n").unwrap_err();
		assert!(matches!(err, ConfigError::MissingField(ref f) if f == "providers.x.base_url"));
	}

	#[test]
	fn http_provider_needs_credential() {
		let err = load("[providers.x]\nkind = \"scim\"\nbase_url = \"https://scim.example.com\"\n")
			.unwrap_err();
		assert!(matches!(err, ConfigError::MissingField(ref f) if f == "providers.x.credential"));
	}

	#[test]
	fn non_http_scheme_is_rejected() {
		let err = load(
			"[providers.x]\nkind = \"scim\"\nbase_url = \"ftp://scim.example.com\"\ncredential = \"env:X\"\n",
		)
		.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}

	#[test]
	fn memory_provider_needs_nothing_else() {
		assert!(load("[providers.m]\nkind = \"memory\"\n").is_ok());
	}

	#[test]
	fn unknown_target_is_rejected() {
		let err = load(&format!("[sync]\ntargets = [\"okta\"]\n{PROVIDERS}")).unwrap_err();
		assert!(matches!(err, ConfigError::ProviderNotFound(ref n) if n == "okta"));
	}

	#[test]
	fn target_equal_to_source_is_rejected() {
		let err = load(&format!(
			"[sync]\nsource = \"entra\"\ntargets = [\"entra\"]\n{PROVIDERS}"
		))
		.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "sync.targets"));
	}

	#[test]
	fn duplicate_target_is_rejected() {
		let err = load(&format!(
			"[sync]\nsource = \"sailpoint\"\ntargets = [\"entra\", \"entra\"]\n{PROVIDERS}"
		))
		.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}

	#[test]
	fn retry_bounds_are_enforced() {
		assert!(load("[retry]\nmax_attempts = 0\n").is_err());
		assert!(load("[retry]\nmax_attempts = 21\n").is_err());
		assert!(load("[retry]\nbackoff_factor = 0.5\n").is_err());
		assert!(load("[retry]\nbase_delay_ms = 10000\nmax_delay_ms = 100\n").is_err());
		assert!(load("[retry]\nmax_attempts = 20\nbackoff_factor = 10.0\n").is_ok());
	}

	#[test]
	fn zero_timeouts_are_rejected() {
		assert!(load("[sync]\ncall_timeout_secs = 0\n").is_err());
		assert!(load("[sync]\nrun_timeout_secs = 0\n").is_err());
	}

	#[test]
	fn require_mfa_on_scim_only_warns() {
		assert!(load(
			"[providers.slack]\nkind = \"scim\"\nbase_url = \"https://api.slack.com/scim/v2\"\ncredential = \"env:SLACK\"\nrequire_mfa = true\n"
		)
		.is_ok());
	}
}
