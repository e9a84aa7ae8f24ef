// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Human-readable and JSON rendering for command results. Everything here
//! goes to stdout; logs go to stderr.

use std::fmt::Write;

use anyhow::{Context, Result};
use idsync_core::{Identity, RunReport, SkipReason, SyncReport, SyncResult};
use idsync_orchestrator::TargetPlan;
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
	let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
	println!("{rendered}");
	Ok(())
}

pub fn render_identities<'a>(provider: &str, identities: impl IntoIterator<Item = &'a Identity>) -> String {
	let mut out = String::new();
	let mut count = 0;
	let _ = writeln!(out, "{:<12} {:<24} {:<5} ATTRIBUTES", "ID", "NAME", "MFA");
	for identity in identities {
		count += 1;
		let mfa = match identity.mfa_enabled() {
			Some(true) => "on",
			Some(false) => "off",
			None => "-",
		};
		let attributes: Vec<String> = identity
			.attributes()
			.iter()
			.map(|(k, v)| format!("{k}={v}"))
			.collect();
		let _ = writeln!(
			out,
			"{:<12} {:<24} {:<5} {}",
			identity.id(),
			identity.display_name(),
			mfa,
			attributes.join(" ")
		);
	}
	let _ = writeln!(out, "{count} identities in {provider}");
	out
}

fn plural(n: u32) -> &'static str {
	if n == 1 {
		""
	} else {
		"s"
	}
}

fn render_target(out: &mut String, report: &SyncReport) {
	if let Some(error) = &report.fetch_error {
		let _ = writeln!(out, "target {} [{}]: unreachable: {error}", report.target, report.kind);
		return;
	}

	let summary = report.summary();
	let _ = writeln!(
		out,
		"target {} [{}]: {} succeeded, {} failed, {} skipped",
		report.target, report.kind, summary.succeeded, summary.failed, summary.skipped
	);
	for entry in &report.entries {
		let attempts = entry.attempts;
		let _ = match &entry.result {
			SyncResult::Succeeded => writeln!(
				out,
				"  ok       {} ({attempts} attempt{})",
				entry.operation,
				plural(attempts)
			),
			SyncResult::Failed { message, .. } => writeln!(
				out,
				"  FAILED   {}: {message} ({attempts} attempt{})",
				entry.operation,
				plural(attempts)
			),
			SyncResult::Skipped { reason } => {
				let reason = match reason {
					SkipReason::Cancelled => "cancelled",
					SkipReason::TimedOut => "run timed out",
				};
				writeln!(out, "  skipped  {} ({reason})", entry.operation)
			}
		};
	}
	for warning in &report.warnings {
		let _ = writeln!(out, "  warning  {warning}");
	}
}

pub fn render_run_report(report: &RunReport) -> String {
	let mut out = String::new();
	let _ = write!(out, "run {} from {}", report.run_id, report.source);
	if report.cancelled {
		out.push_str(" (cancelled)");
	} else if report.timed_out {
		out.push_str(" (timed out)");
	}
	out.push('\n');

	for target in &report.targets {
		render_target(&mut out, target);
	}

	let summary = report.summary();
	let _ = writeln!(
		out,
		"total: {} succeeded, {} failed, {} skipped",
		summary.succeeded, summary.failed, summary.skipped
	);
	out
}

pub fn render_plans(plans: &[TargetPlan]) -> String {
	let mut out = String::new();
	for target in plans {
		match (&target.plan, &target.fetch_error) {
			(Some(plan), _) => {
				let _ = writeln!(
					out,
					"target {} [{}]: {} operation{}",
					target.target,
					target.kind,
					plan.operations.len(),
					plural(plan.operations.len() as u32)
				);
				for operation in &plan.operations {
					let _ = writeln!(out, "  {operation}");
				}
				for warning in &plan.warnings {
					let _ = writeln!(out, "  warning  {warning}");
				}
			}
			(None, error) => {
				let _ = writeln!(
					out,
					"target {} [{}]: unreachable: {}",
					target.target,
					target.kind,
					error.as_deref().unwrap_or("unknown error")
				);
			}
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use idsync_core::{ProviderError, ProviderKind, SyncOperation};

	fn report(targets: Vec<SyncReport>) -> RunReport {
		let now = "2025-01-01T00:00:00Z".parse().unwrap();
		RunReport {
			run_id: Default::default(),
			source: "sailpoint".to_string(),
			started_at: now,
			completed_at: now,
			targets,
			cancelled: false,
			timed_out: false,
		}
	}

	#[test]
	fn run_report_lists_every_entry() {
		let mut entra = SyncReport::new("entra", ProviderKind::Directory);
		entra.record(
			SyncOperation::Create {
				identity: Identity::new("101", "Priya"),
			},
			SyncResult::Succeeded,
			1,
		);
		entra.record(
			SyncOperation::EnableMfa { id: "101".to_string() },
			SyncResult::failed(&ProviderError::Unauthorized),
			1,
		);
		entra.record(
			SyncOperation::Delete { id: "9".to_string() },
			SyncResult::Skipped {
				reason: SkipReason::Cancelled,
			},
			0,
		);
		let mut jira = SyncReport::new("jira", ProviderKind::Scim);
		jira.fetch_error = Some("unauthorized".to_string());

		let text = render_run_report(&report(vec![entra, jira]));

		assert!(text.contains("target entra [directory]: 1 succeeded, 1 failed, 1 skipped"));
		assert!(text.contains("ok       create 101 (Priya) (1 attempt)"));
		assert!(text.contains("FAILED   enable-mfa 101"));
		assert!(text.contains("skipped  delete 9 (cancelled)"));
		assert!(text.contains("target jira [scim]: unreachable: unauthorized"));
		assert!(text.contains("total: 1 succeeded, 1 failed, 1 skipped"));
	}

	#[test]
	fn identities_table_shows_mfa_state() {
		let identities = [
			Identity::new("201", "TechCorpUser1").with_mfa(Some(true)),
			Identity::new("101", "Priya").with_attribute("role", "Admin"),
		];
		let text = render_identities("entra", &identities);
		assert!(text.lines().nth(1).unwrap().contains(" on "));
		assert!(text.contains("role=Admin"));
		assert!(text.ends_with("2 identities in entra\n"));
	}
}
