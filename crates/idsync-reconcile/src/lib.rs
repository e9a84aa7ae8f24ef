// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Identity reconciler.
//!
//! [`reconcile`] compares a source-of-truth snapshot with one target's
//! snapshot and returns the operations that make the target match the source.
//! It performs no I/O and is deterministic: identical inputs always produce
//! an identical [`Plan`], down to the serialized bytes.
//!
//! Operations are ordered by identifier (byte order) and then by kind
//! (`create`, `update`, `enable-mfa`, `delete`), so every operation for one
//! identity runs after that identity exists.

use idsync_core::{
	FieldChange, Identity, IdentitySet, OperationKind, ReconciliationWarning, Side, SyncOperation,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-target knobs for [`reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
	/// Emit `delete` for identities the source no longer has.
	pub allow_delete: bool,
	/// Every source identity needs MFA at this target.
	pub require_mfa: bool,
	/// The target can enforce MFA. Without it no `enable-mfa` is ever emitted.
	pub mfa_capable: bool,
	/// Remove target attributes the source does not define.
	pub prune_attributes: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
	pub operations: Vec<SyncOperation>,
	pub warnings: Vec<ReconciliationWarning>,
}

impl Plan {
	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}

	pub fn count(&self, kind: OperationKind) -> usize {
		self.operations.iter().filter(|op| op.kind() == kind).count()
	}
}

pub fn reconcile(source: &IdentitySet, target: &IdentitySet, policy: &ReconcilePolicy) -> Plan {
	let mut plan = Plan::default();

	for id in source.duplicates() {
		plan.warnings.push(ReconciliationWarning::DuplicateIdentifier {
			side: Side::Source,
			id: id.clone(),
		});
	}
	for id in target.duplicates() {
		plan.warnings.push(ReconciliationWarning::DuplicateIdentifier {
			side: Side::Target,
			id: id.clone(),
		});
	}

	for wanted in source {
		if !wanted.has_valid_id() {
			plan.warnings.push(ReconciliationWarning::MalformedIdentifier {
				side: Side::Source,
				display_name: wanted.display_name().to_string(),
			});
			continue;
		}

		let observed_mfa = match target.get(wanted.id()) {
			None => {
				plan.operations.push(SyncOperation::Create {
					identity: wanted.clone(),
				});
				None
			}
			Some(current) => {
				let changes = diff(wanted, current, policy.prune_attributes);
				if !changes.is_empty() {
					plan.operations.push(SyncOperation::Update {
						id: wanted.id().to_string(),
						changes,
					});
				}
				current.mfa_enabled()
			}
		};

		if policy.mfa_capable && requires_mfa(wanted, policy) && observed_mfa != Some(true) {
			plan.operations.push(SyncOperation::EnableMfa {
				id: wanted.id().to_string(),
			});
		}
	}

	for existing in target {
		if !existing.has_valid_id() {
			plan.warnings.push(ReconciliationWarning::MalformedIdentifier {
				side: Side::Target,
				display_name: existing.display_name().to_string(),
			});
			continue;
		}
		if policy.allow_delete && !source.contains(existing.id()) {
			plan.operations.push(SyncOperation::Delete {
				id: existing.id().to_string(),
			});
		}
	}

	plan.operations
		.sort_by(|a, b| a.id().as_bytes().cmp(b.id().as_bytes()).then(a.kind().cmp(&b.kind())));

	debug!(
		operations = plan.operations.len(),
		warnings = plan.warnings.len(),
		"reconciled snapshot"
	);
	plan
}

fn requires_mfa(identity: &Identity, policy: &ReconcilePolicy) -> bool {
	policy.require_mfa || identity.mfa_enabled() == Some(true)
}

/// Changed fields only, display name first then attributes by name.
fn diff(wanted: &Identity, current: &Identity, prune: bool) -> Vec<FieldChange> {
	let mut changes = Vec::new();

	if wanted.display_name() != current.display_name() {
		changes.push(FieldChange::DisplayName {
			value: wanted.display_name().to_string(),
		});
	}

	let mut attribute_changes: Vec<FieldChange> = wanted
		.attributes()
		.iter()
		.filter(|(name, value)| current.attribute(name) != Some(value.as_str()))
		.map(|(name, value)| FieldChange::SetAttribute {
			name: name.clone(),
			value: value.clone(),
		})
		.collect();

	if prune {
		attribute_changes.extend(
			current
				.attributes()
				.keys()
				.filter(|name| wanted.attribute(name).is_none())
				.map(|name| FieldChange::RemoveAttribute { name: name.clone() }),
		);
		attribute_changes.sort_by(|a, b| a.field().cmp(b.field()));
	}

	changes.extend(attribute_changes);
	changes
}

/// Applies `operations` to a snapshot the way a conforming provider would.
///
/// Creating an existing identity keeps the existing record and deleting a
/// missing one does nothing.
pub fn apply(snapshot: &IdentitySet, operations: &[SyncOperation]) -> IdentitySet {
	let mut identities: std::collections::BTreeMap<String, Identity> = snapshot
		.iter()
		.map(|identity| (identity.id().to_string(), identity.clone()))
		.collect();

	for operation in operations {
		match operation {
			SyncOperation::Create { identity } => {
				identities
					.entry(identity.id().to_string())
					.or_insert_with(|| identity.clone());
			}
			SyncOperation::Update { id, changes } => {
				if let Some(current) = identities.get_mut(id) {
					*current = current.with_changes(changes);
				}
			}
			SyncOperation::EnableMfa { id } => {
				if let Some(current) = identities.get_mut(id) {
					*current = current.clone().with_mfa(Some(true));
				}
			}
			SyncOperation::Delete { id } => {
				identities.remove(id);
			}
		}
	}

	IdentitySet::from_identities(identities.into_values())
}
