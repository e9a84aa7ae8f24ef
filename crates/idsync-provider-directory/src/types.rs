// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Graph-style wire types.

use idsync_core::{FieldChange, Identity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Properties requested from `/users`.
pub const USER_SELECT: &str = "id,displayName,jobTitle,department,mail,userPrincipalName";

/// One page of an OData collection.
#[derive(Debug, Deserialize)]
pub struct ODataPage<T> {
	#[serde(default = "Vec::new")]
	pub value: Vec<T>,
	#[serde(rename = "@odata.nextLink")]
	pub next_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
	pub id: String,
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub job_title: Option<String>,
	#[serde(default)]
	pub department: Option<String>,
	#[serde(default)]
	pub mail: Option<String>,
	#[serde(default)]
	pub user_principal_name: Option<String>,
}

impl DirectoryUser {
	pub fn into_identity(self, mfa_enforced: bool) -> Identity {
		let display_name = self
			.display_name
			.or_else(|| self.user_principal_name.clone())
			.unwrap_or_else(|| self.id.clone());
		let attributes = [
			("role", self.job_title),
			("department", self.department),
			("mail", self.mail),
			("userPrincipalName", self.user_principal_name),
		]
		.into_iter()
		.filter_map(|(name, value)| value.map(|v| (name, v)));

		Identity::new(self.id, display_name)
			.with_attributes(attributes)
			.with_mfa(Some(mfa_enforced))
	}
}

/// `enabled` means required but not yet registered; both it and `enforced`
/// count as MFA on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PerUserMfaState {
	Enforced,
	Enabled,
	Disabled,
	#[serde(other)]
	Unknown,
}

/// Body of `users/{id}/authentication/requirements`, read and written.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MfaRequirement {
	pub per_user_mfa_state: PerUserMfaState,
}

impl MfaRequirement {
	pub fn new(enabled: bool) -> Self {
		Self {
			per_user_mfa_state: if enabled {
				PerUserMfaState::Enforced
			} else {
				PerUserMfaState::Disabled
			},
		}
	}

	pub fn is_required(&self) -> bool {
		matches!(
			self.per_user_mfa_state,
			PerUserMfaState::Enforced | PerUserMfaState::Enabled
		)
	}
}

/// Directory property backing an identity attribute. `role` is the job title.
pub fn property_name(attribute: &str) -> &str {
	match attribute {
		"role" => "jobTitle",
		other => other,
	}
}

/// Body of `POST /users`.
pub fn user_body(identity: &Identity) -> Value {
	let mut body = Map::new();
	body.insert("id".to_string(), Value::from(identity.id()));
	body.insert("displayName".to_string(), Value::from(identity.display_name()));
	for (name, value) in identity.attributes() {
		body.insert(property_name(name).to_string(), Value::from(value.as_str()));
	}
	Value::Object(body)
}

/// Body of `PATCH /users/{id}`. Removed attributes are sent as `null`.
pub fn patch_body(changes: &[FieldChange]) -> Value {
	let mut body = Map::new();
	for change in changes {
		match change {
			FieldChange::DisplayName { value } => {
				body.insert("displayName".to_string(), Value::from(value.as_str()));
			}
			FieldChange::SetAttribute { name, value } => {
				body.insert(property_name(name).to_string(), Value::from(value.as_str()));
			}
			FieldChange::RemoveAttribute { name } => {
				body.insert(property_name(name).to_string(), Value::Null);
			}
		}
	}
	Value::Object(body)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn user_maps_job_title_to_role() {
		let user: DirectoryUser = serde_json::from_value(json!({
			"id": "201",
			"displayName": "TechCorpUser1",
			"jobTitle": "Admin",
			"userPrincipalName": "user1@techcorp.example"
		}))
		.unwrap();
		let identity = user.into_identity(true);
		assert_eq!(identity.attribute("role"), Some("Admin"));
		assert_eq!(
			identity.attribute("userPrincipalName"),
			Some("user1@techcorp.example")
		);
		assert_eq!(identity.attribute("department"), None);
		assert_eq!(identity.mfa_enabled(), Some(true));
	}

	#[test]
	fn missing_display_name_falls_back_to_upn() {
		let user: DirectoryUser = serde_json::from_value(json!({
			"id": "203",
			"userPrincipalName": "svc@techcorp.example"
		}))
		.unwrap();
		assert_eq!(user.into_identity(false).display_name(), "svc@techcorp.example");
	}

	#[test]
	fn mfa_requirement_wire_format() {
		assert_eq!(
			serde_json::to_value(MfaRequirement::new(true)).unwrap(),
			json!({"perUserMfaState": "enforced"})
		);
		assert_eq!(
			serde_json::to_value(MfaRequirement::new(false)).unwrap(),
			json!({"perUserMfaState": "disabled"})
		);
	}

	#[test]
	fn requirement_state_reads_back() {
		let read = |state: &str| -> MfaRequirement {
			serde_json::from_value(json!({"perUserMfaState": state})).unwrap()
		};
		assert!(read("enforced").is_required());
		assert!(read("enabled").is_required());
		assert!(!read("disabled").is_required());
		assert_eq!(read("somethingNew").per_user_mfa_state, PerUserMfaState::Unknown);
		assert!(MfaRequirement::new(true).is_required());
	}

	#[test]
	fn patch_body_maps_role_and_removals() {
		let body = patch_body(&[
			FieldChange::SetAttribute {
				name: "role".to_string(),
				value: "User".to_string(),
			},
			FieldChange::RemoveAttribute {
				name: "department".to_string(),
			},
		]);
		assert_eq!(body, json!({"jobTitle": "User", "department": null}));
	}
}
