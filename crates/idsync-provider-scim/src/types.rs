// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! SCIM 2.0 wire types (RFC 7643 / RFC 7644 subset).

use idsync_core::{FieldChange, Identity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_CORE_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const SCHEMA_PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
	#[serde(default)]
	pub schemas: Vec<String>,
	/// Server-assigned resource id, used in `/Users/{id}` paths.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub external_id: Option<String>,
	pub user_name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_type: Option<String>,
	#[serde(default = "default_active")]
	pub active: bool,
}

fn default_active() -> bool {
	true
}

impl ScimUser {
	/// Identifier shared with the source system: `externalId`, else `userName`.
	pub fn identity_id(&self) -> &str {
		self.external_id.as_deref().unwrap_or(&self.user_name)
	}

	pub fn into_identity(self) -> Identity {
		let id = self.identity_id().to_string();
		let display_name = self
			.display_name
			.clone()
			.unwrap_or_else(|| self.user_name.clone());
		let mut identity = Identity::new(id, display_name)
			.with_attribute("active", if self.active { "true" } else { "false" });
		if let Some(title) = self.title {
			identity = identity.with_attribute("role", title);
		}
		if let Some(user_type) = self.user_type {
			identity = identity.with_attribute("userType", user_type);
		}
		identity
	}

	pub fn from_identity(identity: &Identity) -> Self {
		Self {
			schemas: vec![SCHEMA_CORE_USER.to_string()],
			id: None,
			external_id: Some(identity.id().to_string()),
			user_name: identity
				.attribute("userName")
				.unwrap_or(identity.id())
				.to_string(),
			display_name: Some(identity.display_name().to_string()),
			title: identity.attribute("role").map(str::to_string),
			user_type: identity.attribute("userType").map(str::to_string),
			active: identity.attribute("active") != Some("false"),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
	#[serde(default)]
	pub schemas: Vec<String>,
	pub total_results: i64,
	#[serde(default)]
	pub items_per_page: Option<i64>,
	#[serde(default)]
	pub start_index: Option<i64>,
	#[serde(rename = "Resources", default = "Vec::new")]
	pub resources: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
	Add,
	Remove,
	Replace,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchOperation {
	pub op: PatchOp,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchRequest {
	pub schemas: Vec<String>,
	#[serde(rename = "Operations")]
	pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
	pub fn from_changes(changes: &[FieldChange]) -> Self {
		let operations = changes
			.iter()
			.map(|change| match change {
				FieldChange::DisplayName { value } => PatchOperation {
					op: PatchOp::Replace,
					path: Some("displayName".to_string()),
					value: Some(Value::from(value.as_str())),
				},
				FieldChange::SetAttribute { name, value } => PatchOperation {
					op: PatchOp::Replace,
					path: Some(attribute_path(name).to_string()),
					value: Some(attribute_value(name, value)),
				},
				FieldChange::RemoveAttribute { name } => PatchOperation {
					op: PatchOp::Remove,
					path: Some(attribute_path(name).to_string()),
					value: None,
				},
			})
			.collect();

		Self {
			schemas: vec![SCHEMA_PATCH_OP.to_string()],
			operations,
		}
	}
}

/// SCIM attribute path for an identity attribute.
pub fn attribute_path(attribute: &str) -> &str {
	match attribute {
		"role" => "title",
		other => other,
	}
}

fn attribute_value(attribute: &str, value: &str) -> Value {
	match (attribute, value) {
		("active", "true") => Value::Bool(true),
		("active", "false") => Value::Bool(false),
		_ => Value::from(value),
	}
}

/// Escapes a value for use inside a quoted SCIM filter string.
pub fn escape_filter_value(value: &str) -> String {
	value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn external_id_is_preferred_identifier() {
		let user: ScimUser = serde_json::from_value(json!({
			"id": "a1b2",
			"externalId": "101",
			"userName": "priya@techcorp.example",
			"displayName": "Priya",
			"title": "Admin"
		}))
		.unwrap();
		let identity = user.into_identity();
		assert_eq!(identity.id(), "101");
		assert_eq!(identity.attribute("role"), Some("Admin"));
		assert_eq!(identity.attribute("active"), Some("true"));
		assert_eq!(identity.mfa_enabled(), None);
	}

	#[test]
	fn user_name_is_fallback_identifier() {
		let user: ScimUser = serde_json::from_value(json!({
			"id": "c3d4",
			"userName": "ravi",
			"active": false
		}))
		.unwrap();
		let identity = user.into_identity();
		assert_eq!(identity.id(), "ravi");
		assert_eq!(identity.display_name(), "ravi");
		assert_eq!(identity.attribute("active"), Some("false"));
	}

	#[test]
	fn patch_request_uses_patch_op_schema() {
		let patch = PatchRequest::from_changes(&[
			FieldChange::SetAttribute {
				name: "role".to_string(),
				value: "User".to_string(),
			},
			FieldChange::SetAttribute {
				name: "active".to_string(),
				value: "false".to_string(),
			},
			FieldChange::RemoveAttribute {
				name: "userType".to_string(),
			},
		]);
		assert_eq!(
			serde_json::to_value(&patch).unwrap(),
			json!({
				"schemas": [SCHEMA_PATCH_OP],
				"Operations": [
					{"op": "replace", "path": "title", "value": "User"},
					{"op": "replace", "path": "active", "value": false},
					{"op": "remove", "path": "userType"}
				]
			})
		);
	}

	#[test]
	fn filter_values_are_escaped() {
		assert_eq!(escape_filter_value(r#"a"b\c"#), r#"a\"b\\c"#);
	}
}
