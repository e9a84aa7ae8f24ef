// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential references.
//!
//! Configuration never holds a provider token directly. It names where the
//! token lives:
//!
//! - `env:SAILPOINT_TOKEN` reads `SAILPOINT_TOKEN`, or the file named by
//!   `SAILPOINT_TOKEN_FILE` when that is set (Docker/Kubernetes secrets)
//! - `file:/run/secrets/entra` reads the file
//!
//! A single trailing newline is stripped from file contents.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::{env, fs};

use thiserror::Error;
use tracing::debug;

use crate::{Secret, SecretString};

#[derive(Debug, Error)]
pub enum CredentialError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },

	#[error("environment variable {0} is not set")]
	MissingEnv(String),

	#[error("credential resolved to an empty value")]
	Empty,

	#[error("invalid credential reference '{0}': expected 'env:NAME' or 'file:PATH'")]
	InvalidReference(String),
}

/// Where a provider's bearer token is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialRef {
	Env(String),
	File(PathBuf),
}

impl CredentialRef {
	/// Reads the referenced secret.
	pub fn resolve(&self) -> Result<SecretString, CredentialError> {
		let secret = match self {
			CredentialRef::Env(var) => {
				load_secret_env(var)?.ok_or_else(|| CredentialError::MissingEnv(var.clone()))?
			}
			CredentialRef::File(path) => read_secret_file(path)?,
		};
		if secret.is_empty() {
			return Err(CredentialError::Empty);
		}
		Ok(secret)
	}
}

impl FromStr for CredentialRef {
	type Err = CredentialError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if let Some(var) = s.strip_prefix("env:") {
			if !var.is_empty() {
				return Ok(CredentialRef::Env(var.to_string()));
			}
		} else if let Some(path) = s.strip_prefix("file:") {
			if !path.is_empty() {
				return Ok(CredentialRef::File(PathBuf::from(path)));
			}
		}
		Err(CredentialError::InvalidReference(s.to_string()))
	}
}

impl fmt::Display for CredentialRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CredentialRef::Env(var) => write!(f, "env:{var}"),
			CredentialRef::File(path) => write!(f, "file:{}", path.display()),
		}
	}
}

impl serde::Serialize for CredentialRef {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.collect_str(self)
	}
}

impl<'de> serde::Deserialize<'de> for CredentialRef {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(serde::de::Error::custom)
	}
}

/// Load a secret using the `VAR` / `VAR_FILE` convention.
///
/// `{var}_FILE` wins over `{var}`. Returns `Ok(None)` when neither is set.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, CredentialError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(CredentialError::EmptyPath { var: file_var });
		}
		debug!(var = %file_var, "loading secret from file");
		return read_secret_file(&PathBuf::from(path_str)).map(Some);
	}

	Ok(env::var(var).ok().map(Secret::new))
}

fn read_secret_file(path: &PathBuf) -> Result<SecretString, CredentialError> {
	let content = fs::read_to_string(path).map_err(|e| CredentialError::Io {
		path: path.clone(),
		source: e,
	})?;
	let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
	Ok(Secret::new(value))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn parses_env_and_file_references() {
		assert_eq!(
			"env:ENTRA_TOKEN".parse::<CredentialRef>().unwrap(),
			CredentialRef::Env("ENTRA_TOKEN".to_string())
		);
		assert_eq!(
			"file:/run/secrets/scim".parse::<CredentialRef>().unwrap(),
			CredentialRef::File(PathBuf::from("/run/secrets/scim"))
		);
	}

	/// A raw token pasted into config must be rejected, not treated as a path.
	#[test]
	fn rejects_literal_tokens() {
		assert!(matches!(
			"eyJhbGciOi".parse::<CredentialRef>(),
			Err(CredentialError::InvalidReference(_))
		));
		assert!("env:".parse::<CredentialRef>().is_err());
	}

	#[test]
	fn display_round_trips() {
		let reference: CredentialRef = "env:SAILPOINT_TOKEN".parse().unwrap();
		assert_eq!(reference.to_string(), "env:SAILPOINT_TOKEN");
	}

	#[test]
	fn resolves_file_and_strips_newline() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "scim-token").unwrap();
		let reference = CredentialRef::File(file.path().to_path_buf());
		assert_eq!(reference.resolve().unwrap().expose(), "scim-token");
	}

	#[test]
	fn resolves_env_variable() {
		env::set_var("IDSYNC_TEST_CRED_DIRECT", "direct-token");
		let reference = CredentialRef::Env("IDSYNC_TEST_CRED_DIRECT".to_string());
		assert_eq!(reference.resolve().unwrap().expose(), "direct-token");
	}

	#[test]
	fn file_variant_takes_precedence() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "from-file").unwrap();
		env::set_var("IDSYNC_TEST_CRED_BOTH", "from-env");
		env::set_var("IDSYNC_TEST_CRED_BOTH_FILE", file.path());
		let secret = load_secret_env("IDSYNC_TEST_CRED_BOTH").unwrap().unwrap();
		assert_eq!(secret.expose(), "from-file");
	}

	#[test]
	fn missing_env_is_an_error() {
		let reference = CredentialRef::Env("IDSYNC_TEST_CRED_UNSET_9f2c".to_string());
		assert!(matches!(
			reference.resolve(),
			Err(CredentialError::MissingEnv(_))
		));
	}

	#[test]
	fn empty_value_is_an_error() {
		env::set_var("IDSYNC_TEST_CRED_EMPTY", "");
		let reference = CredentialRef::Env("IDSYNC_TEST_CRED_EMPTY".to_string());
		assert!(matches!(reference.resolve(), Err(CredentialError::Empty)));
	}
}
