// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::identity::{Identity, IdentitySet};
use crate::operation::FieldChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
	/// Identity governance platform (system of record).
	Governance,
	/// Cloud directory with authentication policy.
	Directory,
	/// SaaS application reached over SCIM 2.0.
	Scim,
	Memory,
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ProviderKind::Governance => "governance",
			ProviderKind::Directory => "directory",
			ProviderKind::Scim => "scim",
			ProviderKind::Memory => "memory",
		})
	}
}

/// Uniform capability set over one external identity system.
///
/// Every call is stateless request/response and idempotent from the caller's
/// point of view:
///
/// - `create_identity` for an identifier that already exists returns the
///   existing record instead of failing
/// - `delete_identity` for a missing identifier succeeds
///
/// The orchestrator relies on this when it retries after a partial failure.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
	/// Configured name of this provider instance (e.g. `"entra"`).
	fn name(&self) -> &str;

	fn kind(&self) -> ProviderKind;

	/// Whether `set_mfa` has any effect on this system.
	fn supports_mfa(&self) -> bool {
		false
	}

	async fn fetch_identities(&self) -> Result<IdentitySet, ProviderError>;

	async fn create_identity(&self, identity: &Identity) -> Result<Identity, ProviderError>;

	async fn update_identity(&self, id: &str, changes: &[FieldChange]) -> Result<(), ProviderError>;

	async fn delete_identity(&self, id: &str) -> Result<(), ProviderError>;

	/// No-op for providers without MFA semantics.
	async fn set_mfa(&self, id: &str, enabled: bool) -> Result<(), ProviderError> {
		debug!(provider = %self.name(), id, enabled, "provider has no MFA semantics, ignoring");
		Ok(())
	}
}
