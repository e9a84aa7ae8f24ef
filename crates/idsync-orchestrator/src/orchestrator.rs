// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashSet;
use std::future;
use std::sync::Arc;

use chrono::Utc;
use idsync_core::{
	IdentityProvider, IdentitySet, ProviderError, ProviderKind, RunError, RunReport, SkipReason,
	SyncReport, SyncResult,
};
use idsync_reconcile::{reconcile, Plan};
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{OrchestratorConfig, SyncTarget};
use crate::execute::{drive, fetch_snapshot};

/// What a run would do to one target, without doing it.
#[derive(Debug, Clone, Serialize)]
pub struct TargetPlan {
	pub target: String,
	pub kind: ProviderKind,
	pub plan: Option<Plan>,
	pub fetch_error: Option<String>,
}

/// Stop signals seen by a worker: the caller's token and the run's child token.
#[derive(Clone)]
struct StopSignal {
	caller: CancellationToken,
	run: CancellationToken,
}

impl StopSignal {
	fn is_stopped(&self) -> bool {
		self.run.is_cancelled()
	}

	fn reason(&self) -> SkipReason {
		if self.caller.is_cancelled() {
			SkipReason::Cancelled
		} else {
			SkipReason::TimedOut
		}
	}
}

struct WorkerOutcome {
	index: usize,
	report: SyncReport,
	fetch_failure: Option<ProviderError>,
}

/// Drives one source against many targets.
///
/// Each target gets its own task. Operations for a target run one at a time
/// in plan order, and a failure on one target never affects another.
pub struct SyncOrchestrator {
	source: Arc<dyn IdentityProvider>,
	targets: Vec<SyncTarget>,
	config: Arc<OrchestratorConfig>,
}

impl SyncOrchestrator {
	pub fn new(
		source: Arc<dyn IdentityProvider>,
		targets: Vec<SyncTarget>,
		config: OrchestratorConfig,
	) -> Self {
		Self {
			source,
			targets,
			config: Arc::new(config),
		}
	}

	fn validate(&self) -> Result<(), RunError> {
		self.config.validate()?;
		if self.targets.is_empty() {
			return Err(RunError::InvalidConfig("no targets configured".to_string()));
		}
		let mut seen = HashSet::new();
		for target in &self.targets {
			if target.name() == self.source.name() {
				return Err(RunError::InvalidConfig(format!(
					"target '{}' is also the source",
					target.name()
				)));
			}
			if !seen.insert(target.name()) {
				return Err(RunError::InvalidConfig(format!(
					"target '{}' is configured twice",
					target.name()
				)));
			}
		}
		Ok(())
	}

	async fn fetch_source(&self, stop: &CancellationToken) -> Result<Arc<IdentitySet>, RunError> {
		match fetch_snapshot(self.source.as_ref(), &self.config, stop).await {
			Ok(snapshot) => {
				info!(source = %self.source.name(), count = snapshot.len(), "fetched source snapshot");
				Ok(Arc::new(snapshot))
			}
			Err(err) => {
				error!(source = %self.source.name(), error = %err, "source unavailable");
				Err(RunError::SourceUnavailable {
					name: self.source.name().to_string(),
					source: err,
				})
			}
		}
	}

	/// Computes every target's plan without executing anything.
	#[instrument(skip(self), fields(source = %self.source.name()))]
	pub async fn plan(&self) -> Result<Vec<TargetPlan>, RunError> {
		self.validate()?;
		let source = self.fetch_source(&CancellationToken::new()).await?;

		let mut tasks = JoinSet::new();
		for (index, target) in self.targets.iter().cloned().enumerate() {
			let source = Arc::clone(&source);
			let config = Arc::clone(&self.config);
			tasks.spawn(async move {
				let never = CancellationToken::new();
				let plan = fetch_snapshot(target.provider.as_ref(), &config, &never)
					.await
					.map(|current| reconcile(&source, &current, &target.effective_policy()));
				(index, plan)
			});
		}

		let mut slots: Vec<Option<Result<Plan, ProviderError>>> = vec![None; self.targets.len()];
		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((index, plan)) => slots[index] = Some(plan),
				Err(err) => error!(error = %err, "plan worker failed"),
			}
		}

		let mut failures = Vec::new();
		let plans: Vec<TargetPlan> = self
			.targets
			.iter()
			.zip(slots)
			.map(|(target, slot)| {
				let outcome = slot.unwrap_or_else(|| Err(ProviderError::transient("plan worker failed")));
				let (plan, fetch_error) = match outcome {
					Ok(plan) => (Some(plan), None),
					Err(err) => {
						failures.push((target.name().to_string(), err.clone()));
						(None, Some(err.to_string()))
					}
				};
				TargetPlan {
					target: target.name().to_string(),
					kind: target.provider.kind(),
					plan,
					fetch_error,
				}
			})
			.collect();

		if failures.len() == plans.len() {
			return Err(RunError::NoTargetReachable { failures });
		}
		Ok(plans)
	}

	/// Runs a full sync.
	///
	/// Cancelling `cancel` (or hitting the run timeout) stops new operations
	/// on every target; the partial report is still returned.
	#[instrument(skip(self, cancel), fields(source = %self.source.name()))]
	pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport, RunError> {
		self.validate()?;

		let run_id = Uuid::new_v4();
		let started_at = Utc::now();
		info!(%run_id, targets = self.targets.len(), "starting sync run");

		let stop = StopSignal {
			run: cancel.child_token(),
			caller: cancel.clone(),
		};

		let work = self.sync_all(stop.clone());
		tokio::pin!(work);

		let deadline = async {
			match self.config.run_timeout {
				Some(limit) => tokio::time::sleep(limit).await,
				None => future::pending::<()>().await,
			}
		};

		let mut timed_out = false;
		let outcomes = tokio::select! {
			outcomes = &mut work => outcomes,
			_ = deadline => {
				warn!(%run_id, "run timeout reached, stopping");
				timed_out = true;
				stop.run.cancel();
				work.await
			}
		}?;

		let mut failures = Vec::new();
		let mut reports = Vec::with_capacity(outcomes.len());
		for outcome in outcomes {
			if let Some(err) = outcome.fetch_failure {
				failures.push((outcome.report.target.clone(), err));
			}
			reports.push(outcome.report);
		}
		if failures.len() == reports.len() {
			error!(%run_id, "no target could be reached");
			return Err(RunError::NoTargetReachable { failures });
		}

		let report = RunReport {
			run_id,
			source: self.source.name().to_string(),
			started_at,
			completed_at: Utc::now(),
			targets: reports,
			cancelled: cancel.is_cancelled(),
			timed_out,
		};

		let summary = report.summary();
		info!(
			%run_id,
			succeeded = summary.succeeded,
			failed = summary.failed,
			skipped = summary.skipped,
			cancelled = report.cancelled,
			timed_out = report.timed_out,
			"sync run finished"
		);
		Ok(report)
	}

	async fn sync_all(&self, stop: StopSignal) -> Result<Vec<WorkerOutcome>, RunError> {
		let source = self.fetch_source(&stop.run).await?;

		let mut tasks = JoinSet::new();
		for (index, target) in self.targets.iter().cloned().enumerate() {
			tasks.spawn(sync_target(
				index,
				target,
				Arc::clone(&source),
				Arc::clone(&self.config),
				stop.clone(),
			));
		}

		let mut slots: Vec<Option<WorkerOutcome>> = Vec::new();
		slots.resize_with(self.targets.len(), || None);
		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok(outcome) => {
					let index = outcome.index;
					slots[index] = Some(outcome);
				}
				Err(err) => error!(error = %err, "target worker failed"),
			}
		}

		Ok(self
			.targets
			.iter()
			.zip(slots)
			.enumerate()
			.map(|(index, (target, slot))| {
				slot.unwrap_or_else(|| {
					let err = ProviderError::transient("target worker failed");
					let mut report = SyncReport::new(target.name(), target.provider.kind());
					report.fetch_error = Some(err.to_string());
					WorkerOutcome {
						index,
						report,
						fetch_failure: Some(err),
					}
				})
			})
			.collect())
	}
}

#[instrument(skip_all, fields(target = %target.name()))]
async fn sync_target(
	index: usize,
	target: SyncTarget,
	source: Arc<IdentitySet>,
	config: Arc<OrchestratorConfig>,
	stop: StopSignal,
) -> WorkerOutcome {
	let provider = target.provider.as_ref();
	let mut report = SyncReport::new(provider.name(), provider.kind());

	let current = match fetch_snapshot(provider, &config, &stop.run).await {
		Ok(current) => current,
		Err(err) => {
			error!(error = %err, "target unreachable");
			report.fetch_error = Some(err.to_string());
			return WorkerOutcome {
				index,
				report,
				fetch_failure: Some(err),
			};
		}
	};

	let plan = reconcile(&source, &current, &target.effective_policy());
	for warning in &plan.warnings {
		warn!(%warning, "reconciliation warning");
	}
	report.warnings = plan.warnings;
	info!(operations = plan.operations.len(), "executing plan");

	for operation in plan.operations {
		if stop.is_stopped() {
			report.record(
				operation,
				SyncResult::Skipped {
					reason: stop.reason(),
				},
				0,
			);
			continue;
		}

		let state = drive(provider, &operation, &config, &stop.run).await;
		let (result, attempts) = state
			.into_result()
			.unwrap_or((SyncResult::failed(&ProviderError::transient("operation did not finish")), 0));
		match &result {
			SyncResult::Succeeded => info!(%operation, attempts, "operation succeeded"),
			SyncResult::Failed { message, .. } => {
				error!(%operation, attempts, error = %message, "operation failed")
			}
			SyncResult::Skipped { .. } => {}
		}
		report.record(operation, result, attempts);
	}

	let summary = report.summary();
	info!(
		succeeded = summary.succeeded,
		failed = summary.failed,
		skipped = summary.skipped,
		"target finished"
	);
	WorkerOutcome {
		index,
		report,
		fetch_failure: None,
	}
}
