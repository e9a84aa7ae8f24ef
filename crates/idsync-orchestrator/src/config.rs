// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use idsync_common_http::RetryConfig;
use idsync_core::{IdentityProvider, RunError};
use idsync_reconcile::ReconcilePolicy;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
	pub retry: RetryConfig,
	/// Upper bound on a single provider call.
	pub call_timeout: Duration,
	/// Upper bound on the whole run. `None` runs until done or cancelled.
	pub run_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			retry: RetryConfig::default(),
			call_timeout: DEFAULT_CALL_TIMEOUT,
			run_timeout: None,
		}
	}
}

impl OrchestratorConfig {
	pub fn validate(&self) -> Result<(), RunError> {
		if self.retry.max_attempts == 0 {
			return Err(RunError::InvalidConfig(
				"retry.max_attempts must be at least 1".to_string(),
			));
		}
		if self.call_timeout.is_zero() {
			return Err(RunError::InvalidConfig(
				"call timeout must be non-zero".to_string(),
			));
		}
		if self.run_timeout.is_some_and(|t| t.is_zero()) {
			return Err(RunError::InvalidConfig(
				"run timeout must be non-zero".to_string(),
			));
		}
		Ok(())
	}
}

/// A provider to converge on the source, with its reconcile policy.
///
/// `policy.mfa_capable` is ignored; the provider's own `supports_mfa` decides.
#[derive(Clone)]
pub struct SyncTarget {
	pub provider: Arc<dyn IdentityProvider>,
	pub policy: ReconcilePolicy,
}

impl SyncTarget {
	pub fn new(provider: Arc<dyn IdentityProvider>, policy: ReconcilePolicy) -> Self {
		Self { provider, policy }
	}

	pub fn name(&self) -> &str {
		self.provider.name()
	}

	pub(crate) fn effective_policy(&self) -> ReconcilePolicy {
		ReconcilePolicy {
			mfa_capable: self.provider.supports_mfa(),
			..self.policy
		}
	}
}

impl std::fmt::Debug for SyncTarget {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncTarget")
			.field("name", &self.provider.name())
			.field("kind", &self.provider.kind())
			.field("policy", &self.policy)
			.finish()
	}
}
