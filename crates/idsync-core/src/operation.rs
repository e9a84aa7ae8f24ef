// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// A single field-level difference carried by an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldChange {
	DisplayName { value: String },
	SetAttribute { name: String, value: String },
	RemoveAttribute { name: String },
}

impl FieldChange {
	pub fn field(&self) -> &str {
		match self {
			FieldChange::DisplayName { .. } => "display_name",
			FieldChange::SetAttribute { name, .. } | FieldChange::RemoveAttribute { name } => name,
		}
	}
}

/// Operation kinds in execution order for a single identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
	Create,
	Update,
	EnableMfa,
	Delete,
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			OperationKind::Create => "create",
			OperationKind::Update => "update",
			OperationKind::EnableMfa => "enable-mfa",
			OperationKind::Delete => "delete",
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncOperation {
	Create { identity: Identity },
	Update { id: String, changes: Vec<FieldChange> },
	EnableMfa { id: String },
	Delete { id: String },
}

impl SyncOperation {
	pub fn id(&self) -> &str {
		match self {
			SyncOperation::Create { identity } => identity.id(),
			SyncOperation::Update { id, .. }
			| SyncOperation::EnableMfa { id }
			| SyncOperation::Delete { id } => id,
		}
	}

	pub fn kind(&self) -> OperationKind {
		match self {
			SyncOperation::Create { .. } => OperationKind::Create,
			SyncOperation::Update { .. } => OperationKind::Update,
			SyncOperation::EnableMfa { .. } => OperationKind::EnableMfa,
			SyncOperation::Delete { .. } => OperationKind::Delete,
		}
	}
}

impl fmt::Display for SyncOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncOperation::Create { identity } => {
				write!(f, "create {} ({})", identity.id(), identity.display_name())
			}
			SyncOperation::Update { id, changes } => {
				let fields: Vec<&str> = changes.iter().map(FieldChange::field).collect();
				write!(f, "update {id} [{}]", fields.join(", "))
			}
			SyncOperation::EnableMfa { id } => write!(f, "enable-mfa {id}"),
			SyncOperation::Delete { id } => write!(f, "delete {id}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kinds_order_create_update_mfa_delete() {
		let mut kinds = vec![
			OperationKind::Delete,
			OperationKind::EnableMfa,
			OperationKind::Create,
			OperationKind::Update,
		];
		kinds.sort();
		assert_eq!(
			kinds,
			[
				OperationKind::Create,
				OperationKind::Update,
				OperationKind::EnableMfa,
				OperationKind::Delete
			]
		);
	}

	#[test]
	fn display_names_the_touched_fields() {
		let op = SyncOperation::Update {
			id: "102".to_string(),
			changes: vec![
				FieldChange::DisplayName {
					value: "Ravi K".to_string(),
				},
				FieldChange::SetAttribute {
					name: "role".to_string(),
					value: "Manager".to_string(),
				},
			],
		};
		assert_eq!(op.to_string(), "update 102 [display_name, role]");
	}

	#[test]
	fn serialized_form_is_tagged() {
		let op = SyncOperation::EnableMfa {
			id: "202".to_string(),
		};
		assert_eq!(
			serde_json::to_string(&op).unwrap(),
			r#"{"kind":"enable_mfa","id":"202"}"#
		);
	}
}
