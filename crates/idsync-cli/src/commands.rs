// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use idsync_common_http::retry;
use idsync_config::IdsyncConfig;
use idsync_core::{Identity, IdentityProvider};
use idsync_orchestrator::execute::{fetch_snapshot, timed};
use idsync_orchestrator::{CancellationToken, SyncOrchestrator};
use serde_json::json;
use tracing::{info, warn};

use crate::output::{print_json, render_identities, render_plans, render_run_report};
use crate::providers::{build_provider, build_target, orchestrator_config};

/// Cancels `cancel` on the first Ctrl-C.
pub async fn cancel_on_ctrl_c(cancel: CancellationToken) {
	if tokio::signal::ctrl_c().await.is_ok() {
		warn!("interrupt received, finishing in-flight calls and stopping");
		cancel.cancel();
	}
}

fn build_orchestrator(config: &IdsyncConfig) -> Result<SyncOrchestrator> {
	let Some(source) = config.sync.source.as_deref() else {
		bail!("no source provider: pass --source or set [sync] source");
	};
	if config.sync.targets.is_empty() {
		bail!("no target providers: pass --target or set [sync] targets");
	}

	let source = build_provider(config.provider(source)?)?;
	let targets = config
		.sync
		.targets
		.iter()
		.map(|name| build_target(config.provider(name)?))
		.collect::<Result<Vec<_>>>()?;

	Ok(SyncOrchestrator::new(source, targets, orchestrator_config(config)))
}

pub async fn sync(config: &IdsyncConfig, json: bool) -> Result<ExitCode> {
	let orchestrator = build_orchestrator(config)?;

	let cancel = CancellationToken::new();
	let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
	let result = orchestrator.run(cancel).await;
	watcher.abort();

	let report = result.context("sync run failed")?;
	if json {
		print_json(&report)?;
	} else {
		print!("{}", render_run_report(&report));
	}
	Ok(ExitCode::from(report.exit_code()))
}

pub async fn plan(config: &IdsyncConfig, json: bool) -> Result<ExitCode> {
	let plans = build_orchestrator(config)?
		.plan()
		.await
		.context("failed to compute plan")?;
	if json {
		print_json(&plans)?;
	} else {
		print!("{}", render_plans(&plans));
	}
	Ok(ExitCode::SUCCESS)
}

fn provider(config: &IdsyncConfig, name: &str) -> Result<Arc<dyn IdentityProvider>> {
	build_provider(config.provider(name)?)
}

pub async fn fetch(config: &IdsyncConfig, name: &str, json: bool) -> Result<ExitCode> {
	let provider = provider(config, name)?;
	let cancel = CancellationToken::new();
	let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
	let fetched = fetch_snapshot(provider.as_ref(), &orchestrator_config(config), &cancel).await;
	watcher.abort();
	let identities = fetched.with_context(|| format!("failed to fetch identities from '{name}'"))?;

	for id in identities.duplicates() {
		warn!(provider = %name, %id, "duplicate identifier, first record kept");
	}
	if json {
		let list: Vec<&Identity> = identities.iter().collect();
		print_json(&list)?;
	} else {
		print!("{}", render_identities(name, identities.iter()));
	}
	Ok(ExitCode::SUCCESS)
}

/// Runs one provider call with the configured retry policy and call timeout.
async fn call<T, F, Fut>(config: &IdsyncConfig, f: F) -> Result<T, idsync_core::ProviderError>
where
	F: Fn() -> Fut,
	Fut: std::future::Future<Output = Result<T, idsync_core::ProviderError>>,
{
	retry(&config.retry, || timed(config.sync.call_timeout, f())).await
}

pub async fn provision(
	config: &IdsyncConfig,
	name: &str,
	identity: Identity,
	json: bool,
) -> Result<ExitCode> {
	let provider = provider(config, name)?;
	let created = call(config, || provider.create_identity(&identity))
		.await
		.with_context(|| format!("failed to provision {} at '{name}'", identity.id()))?;
	info!(provider = %name, id = %created.id(), "identity provisioned");

	if json {
		print_json(&json!({ "status": "success", "provider": name, "identity": created }))?;
	} else {
		println!("provisioned {} ({}) at {name}", created.id(), created.display_name());
	}
	Ok(ExitCode::SUCCESS)
}

pub async fn deprovision(config: &IdsyncConfig, name: &str, id: &str, json: bool) -> Result<ExitCode> {
	let provider = provider(config, name)?;
	call(config, || provider.delete_identity(id))
		.await
		.with_context(|| format!("failed to deprovision {id} at '{name}'"))?;
	info!(provider = %name, %id, "identity deprovisioned");

	if json {
		print_json(&json!({ "status": "success", "provider": name, "id": id }))?;
	} else {
		println!("deprovisioned {id} at {name}");
	}
	Ok(ExitCode::SUCCESS)
}

pub async fn enable_mfa(config: &IdsyncConfig, name: &str, id: &str, json: bool) -> Result<ExitCode> {
	let provider = provider(config, name)?;
	if !provider.supports_mfa() {
		warn!(provider = %name, kind = %provider.kind(), "provider has no MFA semantics, nothing to enforce");
	}
	call(config, || provider.set_mfa(id, true))
		.await
		.with_context(|| format!("failed to enable MFA for {id} at '{name}'"))?;

	if json {
		print_json(&json!({
			"status": "success",
			"provider": name,
			"id": id,
			"mfa_enforced": provider.supports_mfa(),
		}))?;
	} else if provider.supports_mfa() {
		println!("MFA enforced for {id} at {name}");
	} else {
		println!("{name} does not manage MFA; nothing changed for {id}");
	}
	Ok(ExitCode::SUCCESS)
}
