// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Offline end-to-end walkthrough against in-memory providers.
//!
//! The governance system is the source of record. Its identities are pushed
//! to a directory that requires MFA for everyone, to a provision-only SaaS
//! application and to a second application that also removes accounts the
//! source no longer has.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use idsync_core::{Identity, IdentityProvider, RunReport};
use idsync_orchestrator::{CancellationToken, OrchestratorConfig, SyncOrchestrator, SyncTarget};
use idsync_provider_memory::{Fixture, InMemoryProvider};
use idsync_reconcile::ReconcilePolicy;
use tracing::info;

use crate::commands::cancel_on_ctrl_c;
use crate::output::{print_json, render_identities, render_run_report};

pub struct DemoWorld {
	pub governance: Arc<InMemoryProvider>,
	pub directory: Arc<InMemoryProvider>,
	pub salesforce: Arc<InMemoryProvider>,
	pub jira: Arc<InMemoryProvider>,
}

impl DemoWorld {
	pub fn new() -> Self {
		Self {
			governance: Arc::new(InMemoryProvider::with_fixture("sailpoint", Fixture::Governance)),
			directory: Arc::new(InMemoryProvider::with_fixture("entra", Fixture::Directory)),
			salesforce: Arc::new(InMemoryProvider::new("salesforce")),
			jira: Arc::new(InMemoryProvider::new("jira").with_identities([Identity::new(
				"104",
				"Former Contractor",
			)
			.with_attribute("role", "Contractor")])),
		}
	}

	pub fn new_hire() -> Identity {
		Identity::new("103", "Jane Doe").with_attribute("role", "Manager")
	}

	pub fn orchestrator(&self, config: OrchestratorConfig) -> SyncOrchestrator {
		let targets = vec![
			SyncTarget::new(
				self.directory.clone(),
				ReconcilePolicy {
					require_mfa: true,
					..Default::default()
				},
			),
			SyncTarget::new(self.salesforce.clone(), ReconcilePolicy::default()),
			SyncTarget::new(
				self.jira.clone(),
				ReconcilePolicy {
					allow_delete: true,
					..Default::default()
				},
			),
		];
		SyncOrchestrator::new(self.governance.clone(), targets, config)
	}

	/// Provisions the new hire at the source, then syncs every target.
	pub async fn run(&self, config: OrchestratorConfig, cancel: CancellationToken) -> Result<RunReport> {
		let hire = Self::new_hire();
		self
			.governance
			.create_identity(&hire)
			.await
			.context("failed to provision new hire at the source")?;
		info!(id = %hire.id(), "new hire provisioned at the source");

		self
			.orchestrator(config)
			.run(cancel)
			.await
			.context("demo sync failed")
	}
}

impl Default for DemoWorld {
	fn default() -> Self {
		Self::new()
	}
}

pub async fn run(config: OrchestratorConfig, json: bool) -> Result<ExitCode> {
	let world = DemoWorld::new();

	if !json {
		let source = world.governance.snapshot().await;
		println!("== source before sync");
		print!("{}", render_identities(world.governance.name(), source.iter()));
		let directory = world.directory.snapshot().await;
		println!("\n== directory before sync");
		print!("{}", render_identities(world.directory.name(), directory.iter()));
	}

	let cancel = CancellationToken::new();
	let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
	let result = world.run(config, cancel).await;
	watcher.abort();
	let report = result?;

	if json {
		print_json(&report)?;
	} else {
		println!("\n== sync report");
		print!("{}", render_run_report(&report));
		let directory = world.directory.snapshot().await;
		println!("\n== directory after sync");
		print!("{}", render_identities(world.directory.name(), directory.iter()));
	}
	Ok(ExitCode::from(report.exit_code()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use idsync_core::OperationKind;
	use idsync_orchestrator::RetryConfig;
	use idsync_provider_memory::CallKind;

	fn config() -> OrchestratorConfig {
		OrchestratorConfig {
			retry: RetryConfig::immediate(3),
			..Default::default()
		}
	}

	fn kinds(report: &RunReport, target: &str) -> Vec<(String, OperationKind)> {
		report
			.target(target)
			.unwrap()
			.entries
			.iter()
			.map(|e| (e.operation.id().to_string(), e.operation.kind()))
			.collect()
	}

	#[tokio::test]
	async fn demo_converges_every_target() {
		let world = DemoWorld::new();
		let report = world.run(config(), CancellationToken::new()).await.unwrap();

		assert_eq!(report.exit_code(), 0);
		assert_eq!(report.summary().succeeded, 13);

		assert_eq!(
			kinds(&report, "entra"),
			[
				("101".to_string(), OperationKind::Create),
				("101".to_string(), OperationKind::EnableMfa),
				("102".to_string(), OperationKind::Create),
				("102".to_string(), OperationKind::EnableMfa),
				("103".to_string(), OperationKind::Create),
				("103".to_string(), OperationKind::EnableMfa),
			]
		);
		assert_eq!(
			kinds(&report, "jira"),
			[
				("101".to_string(), OperationKind::Create),
				("102".to_string(), OperationKind::Create),
				("103".to_string(), OperationKind::Create),
				("104".to_string(), OperationKind::Delete),
			]
		);
		assert_eq!(kinds(&report, "salesforce").len(), 3);

		let directory = world.directory.snapshot().await;
		assert_eq!(directory.get("103").unwrap().mfa_enabled(), Some(true));
		assert!(directory.contains("202"), "provision-only targets keep unknown users");
		assert!(!world.jira.snapshot().await.contains("104"));
		assert_eq!(world.salesforce.call_count(CallKind::SetMfa).await, 0);
	}

	#[tokio::test]
	async fn second_demo_run_changes_nothing() {
		let world = DemoWorld::new();
		world.run(config(), CancellationToken::new()).await.unwrap();

		let again = world
			.orchestrator(config())
			.run(CancellationToken::new())
			.await
			.unwrap();
		assert_eq!(again.summary().total(), 0);
	}
}
