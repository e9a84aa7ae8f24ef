// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::operation::FieldChange;

/// A user record as seen by one provider at one point in time.
///
/// Identities are never mutated in place. Builder methods consume the value and
/// a later fetch produces a fresh `Identity` that supersedes the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	id: String,
	display_name: String,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	attributes: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	mfa_enabled: Option<bool>,
}

impl Identity {
	pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			display_name: display_name.into(),
			attributes: BTreeMap::new(),
			mfa_enabled: None,
		}
	}

	pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.attributes
			.extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
		self
	}

	/// `None` means the provider does not track MFA.
	pub fn with_mfa(mut self, mfa_enabled: Option<bool>) -> Self {
		self.mfa_enabled = mfa_enabled;
		self
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn display_name(&self) -> &str {
		&self.display_name
	}

	pub fn attributes(&self) -> &BTreeMap<String, String> {
		&self.attributes
	}

	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.get(name).map(String::as_str)
	}

	pub fn mfa_enabled(&self) -> Option<bool> {
		self.mfa_enabled
	}

	/// Empty or whitespace-only identifiers cannot be addressed at any provider.
	pub fn has_valid_id(&self) -> bool {
		!self.id.trim().is_empty()
	}

	/// Returns the identity that results from applying `changes`.
	pub fn with_changes(&self, changes: &[FieldChange]) -> Identity {
		let mut next = self.clone();
		for change in changes {
			match change {
				FieldChange::DisplayName { value } => next.display_name = value.clone(),
				FieldChange::SetAttribute { name, value } => {
					next.attributes.insert(name.clone(), value.clone());
				}
				FieldChange::RemoveAttribute { name } => {
					next.attributes.remove(name);
				}
			}
		}
		next
	}
}

/// Snapshot of every identity one provider holds, keyed by identifier.
///
/// Keys are unique. When a provider returns the same identifier twice the
/// first record wins and the identifier is remembered in
/// [`IdentitySet::duplicates`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentitySet {
	identities: BTreeMap<String, Identity>,
	duplicates: Vec<String>,
}

impl IdentitySet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_identities<I>(identities: I) -> Self
	where
		I: IntoIterator<Item = Identity>,
	{
		let mut set = Self::default();
		for identity in identities {
			if set.identities.contains_key(identity.id()) {
				warn!(id = %identity.id(), "duplicate identifier in provider snapshot, keeping first");
				set.duplicates.push(identity.id().to_string());
				continue;
			}
			set.identities.insert(identity.id().to_string(), identity);
		}
		set
	}

	pub fn get(&self, id: &str) -> Option<&Identity> {
		self.identities.get(id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.identities.contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.identities.len()
	}

	pub fn is_empty(&self) -> bool {
		self.identities.is_empty()
	}

	/// Identities in identifier order.
	pub fn iter(&self) -> impl Iterator<Item = &Identity> {
		self.identities.values()
	}

	pub fn ids(&self) -> impl Iterator<Item = &str> {
		self.identities.keys().map(String::as_str)
	}

	pub fn duplicates(&self) -> &[String] {
		&self.duplicates
	}
}

impl FromIterator<Identity> for IdentitySet {
	fn from_iter<T: IntoIterator<Item = Identity>>(iter: T) -> Self {
		Self::from_identities(iter)
	}
}

impl<'a> IntoIterator for &'a IdentitySet {
	type Item = &'a Identity;
	type IntoIter = std::collections::btree_map::Values<'a, String, Identity>;

	fn into_iter(self) -> Self::IntoIter {
		self.identities.values()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn priya() -> Identity {
		Identity::new("101", "Priya").with_attribute("role", "Admin")
	}

	#[test]
	fn builder_sets_fields() {
		let identity = priya().with_mfa(Some(true));
		assert_eq!(identity.id(), "101");
		assert_eq!(identity.display_name(), "Priya");
		assert_eq!(identity.attribute("role"), Some("Admin"));
		assert_eq!(identity.mfa_enabled(), Some(true));
	}

	#[test]
	fn blank_identifiers_are_invalid() {
		assert!(!Identity::new("", "Nobody").has_valid_id());
		assert!(!Identity::new("  ", "Nobody").has_valid_id());
		assert!(priya().has_valid_id());
	}

	#[test]
	fn with_changes_leaves_original_untouched() {
		let original = priya();
		let changed = original.with_changes(&[
			FieldChange::DisplayName {
				value: "Priya S".to_string(),
			},
			FieldChange::RemoveAttribute {
				name: "role".to_string(),
			},
		]);
		assert_eq!(original.display_name(), "Priya");
		assert_eq!(changed.display_name(), "Priya S");
		assert_eq!(changed.attribute("role"), None);
	}

	#[test]
	fn set_keeps_first_duplicate() {
		let set = IdentitySet::from_identities(vec![
			priya(),
			Identity::new("101", "Impostor"),
			Identity::new("102", "Ravi"),
		]);
		assert_eq!(set.len(), 2);
		assert_eq!(set.get("101").unwrap().display_name(), "Priya");
		assert_eq!(set.duplicates(), ["101".to_string()]);
	}

	#[test]
	fn set_iterates_in_identifier_order() {
		let set: IdentitySet = vec![Identity::new("b", "B"), Identity::new("a", "A")]
			.into_iter()
			.collect();
		let ids: Vec<&str> = set.ids().collect();
		assert_eq!(ids, ["a", "b"]);
	}

	#[test]
	fn serializes_without_empty_fields() {
		let json = serde_json::to_string(&Identity::new("102", "Ravi")).unwrap();
		assert_eq!(json, r#"{"id":"102","display_name":"Ravi"}"#);
	}
}
