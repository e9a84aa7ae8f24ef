// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Wire types for the governance identities API.

use std::collections::BTreeMap;

use idsync_core::{FieldChange, Identity};
use serde::{Deserialize, Serialize};

/// An identity record as returned by `GET /identities`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GovernanceIdentity {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub attributes: BTreeMap<String, String>,
	/// Older tenants return the role at top level instead of in `attributes`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub role: Option<String>,
}

impl GovernanceIdentity {
	pub fn into_identity(self) -> Identity {
		let mut attributes = self.attributes;
		if let Some(role) = self.role {
			attributes.entry("role".to_string()).or_insert(role);
		}
		Identity::new(self.id, self.name).with_attributes(attributes)
	}
}

impl From<&Identity> for GovernanceIdentity {
	fn from(identity: &Identity) -> Self {
		Self {
			id: identity.id().to_string(),
			name: identity.display_name().to_string(),
			attributes: identity.attributes().clone(),
			role: None,
		}
	}
}

/// Body of `PATCH /identities/{id}`. A `null` attribute value removes it.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct IdentityPatch {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	pub attributes: BTreeMap<String, Option<String>>,
}

impl IdentityPatch {
	pub fn from_changes(changes: &[FieldChange]) -> Self {
		let mut patch = Self::default();
		for change in changes {
			match change {
				FieldChange::DisplayName { value } => patch.name = Some(value.clone()),
				FieldChange::SetAttribute { name, value } => {
					patch.attributes.insert(name.clone(), Some(value.clone()));
				}
				FieldChange::RemoveAttribute { name } => {
					patch.attributes.insert(name.clone(), None);
				}
			}
		}
		patch
	}
}
