// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorKind, ProviderError};
use crate::operation::SyncOperation;
use crate::provider::ProviderKind;

/// Outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncResult {
	Succeeded,
	Failed { kind: ErrorKind, message: String },
	/// Never issued because the run stopped first.
	Skipped { reason: SkipReason },
}

impl SyncResult {
	pub fn failed(err: &ProviderError) -> Self {
		SyncResult::Failed {
			kind: err.kind(),
			message: err.to_string(),
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, SyncResult::Succeeded)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
	Cancelled,
	TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
	pub operation: SyncOperation,
	pub result: SyncResult,
	/// Provider calls made, 0 for skipped operations.
	pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
	Source,
	Target,
}

/// Data-quality problem found while reconciling. Never stops the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ReconciliationWarning {
	MalformedIdentifier { side: Side, display_name: String },
	DuplicateIdentifier { side: Side, id: String },
}

impl std::fmt::Display for ReconciliationWarning {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ReconciliationWarning::MalformedIdentifier { side, display_name } => write!(
				f,
				"{side:?} identity '{display_name}' has an empty identifier, skipped"
			),
			ReconciliationWarning::DuplicateIdentifier { side, id } => {
				write!(f, "{side:?} returned identifier '{id}' more than once")
			}
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
	pub succeeded: usize,
	pub failed: usize,
	pub skipped: usize,
}

impl SyncSummary {
	pub fn total(&self) -> usize {
		self.succeeded + self.failed + self.skipped
	}

	fn add(&mut self, other: SyncSummary) {
		self.succeeded += other.succeeded;
		self.failed += other.failed;
		self.skipped += other.skipped;
	}
}

/// Everything that happened to one target during a run, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
	pub target: String,
	pub kind: ProviderKind,
	pub entries: Vec<SyncEntry>,
	pub warnings: Vec<ReconciliationWarning>,
	/// Set when the target's state could not be fetched; no operations ran.
	pub fetch_error: Option<String>,
}

impl SyncReport {
	pub fn new(target: impl Into<String>, kind: ProviderKind) -> Self {
		Self {
			target: target.into(),
			kind,
			entries: Vec::new(),
			warnings: Vec::new(),
			fetch_error: None,
		}
	}

	pub fn record(&mut self, operation: SyncOperation, result: SyncResult, attempts: u32) {
		self.entries.push(SyncEntry {
			operation,
			result,
			attempts,
		});
	}

	pub fn is_reachable(&self) -> bool {
		self.fetch_error.is_none()
	}

	pub fn summary(&self) -> SyncSummary {
		let mut summary = SyncSummary::default();
		for entry in &self.entries {
			match entry.result {
				SyncResult::Succeeded => summary.succeeded += 1,
				SyncResult::Failed { .. } => summary.failed += 1,
				SyncResult::Skipped { .. } => summary.skipped += 1,
			}
		}
		summary
	}
}

/// Aggregated result of one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
	pub run_id: Uuid,
	pub source: String,
	pub started_at: DateTime<Utc>,
	pub completed_at: DateTime<Utc>,
	pub targets: Vec<SyncReport>,
	pub cancelled: bool,
	pub timed_out: bool,
}

impl RunReport {
	pub fn summary(&self) -> SyncSummary {
		let mut summary = SyncSummary::default();
		for target in &self.targets {
			summary.add(target.summary());
		}
		summary
	}

	pub fn target(&self, name: &str) -> Option<&SyncReport> {
		self.targets.iter().find(|t| t.target == name)
	}

	/// 0 when every operation on every target succeeded. Otherwise the number
	/// of failed or skipped operations plus unreachable targets, capped at 255.
	pub fn exit_code(&self) -> u8 {
		let summary = self.summary();
		let unreachable = self.targets.iter().filter(|t| !t.is_reachable()).count();
		let problems = summary.failed + summary.skipped + unreachable;
		problems.min(u8::MAX as usize) as u8
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn delete(id: &str) -> SyncOperation {
		SyncOperation::Delete { id: id.to_string() }
	}

	fn run_with(targets: Vec<SyncReport>) -> RunReport {
		RunReport {
			run_id: Uuid::new_v4(),
			source: "sailpoint".to_string(),
			started_at: Utc::now(),
			completed_at: Utc::now(),
			targets,
			cancelled: false,
			timed_out: false,
		}
	}

	#[test]
	fn summary_counts_each_outcome() {
		let mut report = SyncReport::new("jira", ProviderKind::Scim);
		report.record(delete("1"), SyncResult::Succeeded, 1);
		report.record(
			delete("2"),
			SyncResult::failed(&ProviderError::Unauthorized),
			1,
		);
		report.record(
			delete("3"),
			SyncResult::Skipped {
				reason: SkipReason::Cancelled,
			},
			0,
		);

		let summary = report.summary();
		assert_eq!(summary.succeeded, 1);
		assert_eq!(summary.failed, 1);
		assert_eq!(summary.skipped, 1);
		assert_eq!(summary.total(), 3);
	}

	#[test]
	fn clean_run_exits_zero() {
		let mut report = SyncReport::new("entra", ProviderKind::Directory);
		report.record(delete("1"), SyncResult::Succeeded, 1);
		assert_eq!(run_with(vec![report]).exit_code(), 0);
	}

	#[test]
	fn unreachable_target_counts_as_problem() {
		let mut report = SyncReport::new("entra", ProviderKind::Directory);
		report.fetch_error = Some("unauthorized".to_string());
		assert_eq!(run_with(vec![report]).exit_code(), 1);
	}

	#[test]
	fn exit_code_is_capped() {
		let mut report = SyncReport::new("salesforce", ProviderKind::Scim);
		for i in 0..300 {
			report.record(
				delete(&i.to_string()),
				SyncResult::failed(&ProviderError::transient("down")),
				3,
			);
		}
		assert_eq!(run_with(vec![report]).exit_code(), 255);
	}
}
