// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration error types.

use std::path::PathBuf;

use idsync_common_secret::CredentialError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("I/O error reading {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("config file {0} does not exist")]
	FileNotFound(PathBuf),

	#[error("environment variable {var}: {message}")]
	Env { var: String, message: String },

	#[error("missing required field: {0}")]
	MissingField(String),

	#[error("invalid value for {field}: {message}")]
	InvalidValue { field: String, message: String },

	#[error("provider '{0}' not found in configuration")]
	ProviderNotFound(String),

	#[error("invalid credential for provider '{provider}': {source}")]
	Credential {
		provider: String,
		#[source]
		source: CredentialError,
	},

	#[error("could not determine home directory")]
	HomeDirNotFound,
}

impl ConfigError {
	pub fn missing_field(field: impl Into<String>) -> Self {
		Self::MissingField(field.into())
	}

	pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			field: field.into(),
			message: message.into(),
		}
	}

	pub fn env(var: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Env {
			var: var.into(),
			message: message.into(),
		}
	}
}
