// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds provider clients from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use idsync_config::{IdsyncConfig, ProviderConfig};
use idsync_core::http::ClientConfig;
use idsync_core::{IdentityProvider, ProviderKind};
use idsync_orchestrator::{OrchestratorConfig, SyncTarget};
use idsync_provider_directory::DirectoryClient;
use idsync_provider_governance::GovernanceClient;
use idsync_provider_memory::{Fixture, InMemoryProvider};
use idsync_provider_scim::ScimClient;
use idsync_reconcile::ReconcilePolicy;
use tracing::debug;

pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn IdentityProvider>> {
	let name = config.name.as_str();
	debug!(provider = %name, kind = %config.kind, "building provider");

	let provider: Arc<dyn IdentityProvider> = match config.kind {
		ProviderKind::Memory => Arc::new(memory_provider(config)?),
		ProviderKind::Governance => Arc::new(
			GovernanceClient::new(name, http_config(config)?).context("failed to build HTTP client")?,
		),
		ProviderKind::Directory => Arc::new(
			DirectoryClient::new(name, http_config(config)?).context("failed to build HTTP client")?,
		),
		ProviderKind::Scim => Arc::new(
			ScimClient::new(name, http_config(config)?).context("failed to build HTTP client")?,
		),
	};
	Ok(provider)
}

fn memory_provider(config: &ProviderConfig) -> Result<InMemoryProvider> {
	let fixture = match config.fixture.as_deref() {
		Some(raw) => raw
			.parse::<Fixture>()
			.with_context(|| format!("providers.{}.fixture", config.name))?,
		None => Fixture::Empty,
	};
	Ok(InMemoryProvider::with_fixture(config.name.as_str(), fixture))
}

fn http_config(config: &ProviderConfig) -> Result<ClientConfig> {
	let name = config.name.as_str();
	let base_url = config
		.base_url
		.as_ref()
		.with_context(|| format!("provider '{name}' has no base_url"))?;
	let credential = config
		.credential
		.as_ref()
		.with_context(|| format!("provider '{name}' has no credential"))?;
	let token = credential
		.resolve()
		.with_context(|| format!("failed to resolve credential for provider '{name}'"))?;

	Ok(ClientConfig::new(base_url.as_str(), token).with_timeout(config.timeout))
}

pub fn policy(config: &ProviderConfig) -> ReconcilePolicy {
	ReconcilePolicy {
		allow_delete: config.allow_delete,
		require_mfa: config.require_mfa,
		prune_attributes: config.prune_attributes,
		mfa_capable: false,
	}
}

pub fn build_target(config: &ProviderConfig) -> Result<SyncTarget> {
	Ok(SyncTarget::new(build_provider(config)?, policy(config)))
}

pub fn orchestrator_config(config: &IdsyncConfig) -> OrchestratorConfig {
	OrchestratorConfig {
		retry: config.retry.clone(),
		call_timeout: config.sync.call_timeout,
		run_timeout: config.sync.run_timeout,
	}
}
