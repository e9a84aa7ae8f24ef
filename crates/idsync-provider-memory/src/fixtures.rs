// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Demo data for offline runs.

use std::fmt;
use std::str::FromStr;

use idsync_core::Identity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fixture {
	/// Governance system of record: Priya (Admin) and Ravi (User).
	Governance,
	/// Directory tenant with one MFA-enrolled and one unenrolled user.
	Directory,
	Empty,
}

#[derive(Debug, Error)]
#[error("unknown fixture '{0}': expected governance, directory or empty")]
pub struct UnknownFixture(pub String);

impl Fixture {
	pub fn identities(self) -> Vec<Identity> {
		match self {
			Fixture::Governance => governance_identities(),
			Fixture::Directory => directory_identities(),
			Fixture::Empty => Vec::new(),
		}
	}
}

impl FromStr for Fixture {
	type Err = UnknownFixture;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"governance" => Ok(Fixture::Governance),
			"directory" => Ok(Fixture::Directory),
			"empty" => Ok(Fixture::Empty),
			other => Err(UnknownFixture(other.to_string())),
		}
	}
}

impl fmt::Display for Fixture {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Fixture::Governance => "governance",
			Fixture::Directory => "directory",
			Fixture::Empty => "empty",
		})
	}
}

pub fn governance_identities() -> Vec<Identity> {
	vec![
		Identity::new("101", "Priya").with_attribute("role", "Admin"),
		Identity::new("102", "Ravi").with_attribute("role", "User"),
	]
}

pub fn directory_identities() -> Vec<Identity> {
	vec![
		Identity::new("201", "TechCorpUser1").with_mfa(Some(true)),
		Identity::new("202", "TechCorpUser2").with_mfa(Some(false)),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_names_case_insensitively() {
		assert_eq!("Governance".parse::<Fixture>().unwrap(), Fixture::Governance);
		assert_eq!(" directory ".parse::<Fixture>().unwrap(), Fixture::Directory);
		assert!("sailpoint".parse::<Fixture>().is_err());
	}

	#[test]
	fn directory_fixture_has_one_unenrolled_user() {
		let unenrolled: Vec<_> = Fixture::Directory
			.identities()
			.into_iter()
			.filter(|i| i.mfa_enabled() == Some(false))
			.collect();
		assert_eq!(unenrolled.len(), 1);
		assert_eq!(unenrolled[0].id(), "202");
	}
}
