// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use idsync_common_http::RetryableError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a provider client can return for a single call.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum ProviderError {
	#[error("unauthorized")]
	Unauthorized,

	#[error("not found: {0}")]
	NotFound(String),

	#[error("rate limited: retry after {retry_after:?}")]
	RateLimited { retry_after: Option<Duration> },

	#[error("transient failure: {0}")]
	Transient(String),

	#[error("malformed data: {0}")]
	Malformed(String),
}

impl ProviderError {
	pub fn transient(message: impl Into<String>) -> Self {
		Self::Transient(message.into())
	}

	pub fn malformed(message: impl Into<String>) -> Self {
		Self::Malformed(message.into())
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			ProviderError::Unauthorized => ErrorKind::Unauthorized,
			ProviderError::NotFound(_) => ErrorKind::NotFound,
			ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
			ProviderError::Transient(_) => ErrorKind::Transient,
			ProviderError::Malformed(_) => ErrorKind::Malformed,
		}
	}
}

impl RetryableError for ProviderError {
	fn is_retryable(&self) -> bool {
		matches!(
			self,
			ProviderError::Transient(_) | ProviderError::RateLimited { .. }
		)
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			ProviderError::RateLimited { retry_after } => *retry_after,
			_ => None,
		}
	}
}

/// Failure classification recorded in sync reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	Unauthorized,
	NotFound,
	RateLimited,
	Transient,
	Malformed,
}

/// Fatal errors that abort a whole orchestration run.
#[derive(Error, Debug)]
pub enum RunError {
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("source provider '{name}' is unavailable: {source}")]
	SourceUnavailable {
		name: String,
		#[source]
		source: ProviderError,
	},

	#[error("no target could be reached ({} unreachable)", .failures.len())]
	NoTargetReachable { failures: Vec<(String, ProviderError)> },
}
