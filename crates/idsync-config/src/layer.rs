// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use std::collections::HashMap;

use idsync_core::ProviderKind;
use serde::Deserialize;

/// Partial configuration layer. Every field is optional so that a higher
/// precedence layer only overrides what it actually sets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
	#[serde(default)]
	pub retry: Option<RetryLayer>,
	#[serde(default)]
	pub sync: Option<SyncLayer>,
	#[serde(default)]
	pub providers: Option<ProvidersLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryLayer {
	#[serde(default)]
	pub max_attempts: Option<u32>,
	#[serde(default)]
	pub base_delay_ms: Option<u64>,
	#[serde(default)]
	pub max_delay_ms: Option<u64>,
	#[serde(default)]
	pub backoff_factor: Option<f64>,
	#[serde(default)]
	pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncLayer {
	#[serde(default)]
	pub source: Option<String>,
	#[serde(default)]
	pub targets: Option<Vec<String>>,
	#[serde(default)]
	pub call_timeout_secs: Option<u64>,
	#[serde(default)]
	pub run_timeout_secs: Option<u64>,
}

/// `[providers.<name>]` tables keyed by provider name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersLayer {
	#[serde(flatten)]
	pub entries: HashMap<String, ProviderLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderLayer {
	#[serde(default)]
	pub kind: Option<ProviderKind>,
	#[serde(default)]
	pub base_url: Option<String>,
	/// `env:VAR` or `file:/path`; never the token itself.
	#[serde(default)]
	pub credential: Option<String>,
	#[serde(default)]
	pub allow_delete: Option<bool>,
	#[serde(default)]
	pub require_mfa: Option<bool>,
	#[serde(default)]
	pub prune_attributes: Option<bool>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
	/// Seed data for `kind = "memory"`.
	#[serde(default)]
	pub fixture: Option<String>,
}

impl ConfigLayer {
	/// Merges `other` on top of `self`.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
		merge_option(&mut self.retry, other.retry, RetryLayer::merge);
		merge_option(&mut self.sync, other.sync, SyncLayer::merge);
		merge_option(&mut self.providers, other.providers, ProvidersLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn override_with<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		override_with(&mut self.level, other.level);
		override_with(&mut self.format, other.format);
	}
}

impl RetryLayer {
	fn merge(&mut self, other: RetryLayer) {
		override_with(&mut self.max_attempts, other.max_attempts);
		override_with(&mut self.base_delay_ms, other.base_delay_ms);
		override_with(&mut self.max_delay_ms, other.max_delay_ms);
		override_with(&mut self.backoff_factor, other.backoff_factor);
		override_with(&mut self.jitter, other.jitter);
	}
}

impl SyncLayer {
	fn merge(&mut self, other: SyncLayer) {
		override_with(&mut self.source, other.source);
		// Target lists replace, they do not accumulate.
		override_with(&mut self.targets, other.targets);
		override_with(&mut self.call_timeout_secs, other.call_timeout_secs);
		override_with(&mut self.run_timeout_secs, other.run_timeout_secs);
	}
}

impl ProvidersLayer {
	fn merge(&mut self, other: ProvidersLayer) {
		for (name, provider) in other.entries {
			match self.entries.get_mut(&name) {
				Some(existing) => existing.merge(provider),
				None => {
					self.entries.insert(name, provider);
				}
			}
		}
	}
}

impl ProviderLayer {
	fn merge(&mut self, other: ProviderLayer) {
		override_with(&mut self.kind, other.kind);
		override_with(&mut self.base_url, other.base_url);
		override_with(&mut self.credential, other.credential);
		override_with(&mut self.allow_delete, other.allow_delete);
		override_with(&mut self.require_mfa, other.require_mfa);
		override_with(&mut self.prune_attributes, other.prune_attributes);
		override_with(&mut self.timeout_secs, other.timeout_secs);
		override_with(&mut self.fixture, other.fixture);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(toml_str: &str) -> ConfigLayer {
		toml::from_str(toml_str).unwrap()
	}

	#[test]
	fn parses_provider_tables() {
		let layer = parse(
			r#"
			[sync]
			source = "sailpoint"
			targets = ["entra", "slack"]

			[providers.sailpoint]
			kind = "governance"
			base_url = "https://iga.example.com/v3"
			credential = "env:SAILPOINT_TOKEN"

			[providers.entra]
			kind = "directory"
			require_mfa = true
			"#,
		);

		let providers = layer.providers.unwrap();
		assert_eq!(providers.entries.len(), 2);
		assert_eq!(providers.entries["sailpoint"].kind, Some(ProviderKind::Governance));
		assert_eq!(providers.entries["entra"].require_mfa, Some(true));
		assert_eq!(
			layer.sync.unwrap().targets,
			Some(vec!["entra".to_string(), "slack".to_string()])
		);
	}

	#[test]
	fn unknown_kind_is_rejected() {
		let result: Result<ConfigLayer, _> = toml::from_str(
			r#"
			[providers.x]
			kind = "ldap"
			"#,
		);
		assert!(result.is_err());
	}

	#[test]
	fn merge_overrides_only_set_fields() {
		let mut base = parse(
			r#"
			[logging]
			level = "info"
			format = "pretty"

			[providers.entra]
			kind = "directory"
			base_url = "https://graph.example.com/v1.0"
			credential = "env:ENTRA_TOKEN"
			"#,
		);
		let top = parse(
			r#"
			[logging]
			level = "debug"

			[providers.entra]
			require_mfa = true
			"#,
		);

		base.merge(top);

		let logging = base.logging.unwrap();
		assert_eq!(logging.level.as_deref(), Some("debug"));
		assert_eq!(logging.format.as_deref(), Some("pretty"));

		let entra = &base.providers.unwrap().entries["entra"];
		assert_eq!(entra.kind, Some(ProviderKind::Directory));
		assert_eq!(entra.credential.as_deref(), Some("env:ENTRA_TOKEN"));
		assert_eq!(entra.require_mfa, Some(true));
	}

	#[test]
	fn target_list_is_replaced() {
		let mut base = parse("[sync]\ntargets = [\"a\", \"b\"]\n");
		base.merge(parse("[sync]\ntargets = [\"c\"]\n"));
		assert_eq!(base.sync.unwrap().targets, Some(vec!["c".to_string()]));
	}
}
