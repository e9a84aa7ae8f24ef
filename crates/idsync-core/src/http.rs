// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Status-code mapping shared by the HTTP provider clients.

use std::time::Duration;

use idsync_common_secret::SecretString;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

use crate::error::ProviderError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings shared by every HTTP provider client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	pub base_url: String,
	pub token: SecretString,
	/// Per-request timeout.
	pub timeout: Duration,
}

impl ClientConfig {
	pub fn new(base_url: impl Into<String>, token: SecretString) -> Self {
		Self {
			base_url: base_url.into(),
			token,
			timeout: DEFAULT_TIMEOUT,
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Joins `path` onto the base URL with exactly one slash between them.
	pub fn endpoint(&self, path: &str) -> String {
		format!(
			"{}/{}",
			self.base_url.trim_end_matches('/'),
			path.trim_start_matches('/')
		)
	}

	/// Builds `base/<segments>` with each segment percent-encoded, so an
	/// identifier can never add path components or start a query.
	///
	/// Empty, `.` and `..` segments are rejected: they would address a
	/// different resource than the one named.
	pub fn resource_url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
		if let Some(bad) = segments
			.iter()
			.find(|s| s.is_empty() || **s == "." || **s == "..")
		{
			return Err(ProviderError::malformed(format!(
				"identifier {bad:?} cannot be used as a URL path segment"
			)));
		}

		let mut url = Url::parse(&self.base_url).map_err(|e| {
			ProviderError::malformed(format!("invalid base URL '{}': {e}", self.base_url))
		})?;
		url.path_segments_mut()
			.map_err(|()| ProviderError::malformed(format!("base URL '{}' cannot carry a path", self.base_url)))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	pub fn build_client(&self) -> Result<Client, reqwest::Error> {
		idsync_common_http::builder().timeout(self.timeout).build()
	}
}

/// Classifies a non-success HTTP status into a [`ProviderError`].
pub fn error_for_status(
	status: StatusCode,
	retry_after: Option<Duration>,
	body: &str,
) -> ProviderError {
	let detail = if body.is_empty() {
		format!("HTTP {status}")
	} else {
		format!("HTTP {status}: {body}")
	};

	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized,
		StatusCode::NOT_FOUND => ProviderError::NotFound(detail),
		StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
		StatusCode::REQUEST_TIMEOUT => ProviderError::Transient(detail),
		s if s.is_server_error() => ProviderError::Transient(detail),
		_ => ProviderError::Malformed(detail),
	}
}

/// Consumes an error response and classifies it.
pub async fn error_for_response(response: Response) -> ProviderError {
	let status = response.status();
	let retry_after = response
		.headers()
		.get(reqwest::header::RETRY_AFTER)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.trim().parse::<u64>().ok())
		.map(Duration::from_secs);
	let body = response.text().await.unwrap_or_default();

	let err = error_for_status(status, retry_after, &body);
	match &err {
		ProviderError::RateLimited { .. } => {
			warn!(status = status.as_u16(), ?retry_after, "provider rate limited")
		}
		_ => error!(status = status.as_u16(), error = %err, "provider request failed"),
	}
	err
}

/// Classifies a transport-level failure.
pub fn error_for_transport(err: reqwest::Error) -> ProviderError {
	if err.is_timeout() {
		return ProviderError::Transient("request timed out".to_string());
	}
	if err.is_decode() {
		return ProviderError::Malformed(err.to_string());
	}
	ProviderError::Transient(err.to_string())
}

/// Sends `request`, mapping only transport failures. The caller inspects the
/// status, which lets clients treat 404 or 409 as success where the
/// operation is idempotent.
pub async fn send(request: RequestBuilder) -> Result<Response, ProviderError> {
	let response = request.send().await.map_err(error_for_transport)?;
	debug!(status = %response.status(), url = %response.url(), "received response");
	Ok(response)
}

/// Sends `request` and fails on any non-success status.
pub async fn send_checked(request: RequestBuilder) -> Result<Response, ProviderError> {
	let response = send(request).await?;
	if response.status().is_success() {
		Ok(response)
	} else {
		Err(error_for_response(response).await)
	}
}

pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
	let body = response.text().await.map_err(error_for_transport)?;
	serde_json::from_str(&body).map_err(|e| {
		error!(error = %e, "failed to parse provider response");
		ProviderError::malformed(format!("JSON parse error: {e}"))
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn endpoint_joins_with_single_slash() {
		let config = ClientConfig::new("https://iga.example.com/api/", SecretString::new("t".into()));
		assert_eq!(config.endpoint("/identities"), "https://iga.example.com/api/identities");
		assert_eq!(config.endpoint("identities/101"), "https://iga.example.com/api/identities/101");
	}

	#[test]
	fn resource_url_escapes_identifiers() {
		let config = ClientConfig::new("https://iga.example.com/api/", SecretString::new("t".into()));
		let url = |segments: &[&str]| config.resource_url(segments).unwrap().to_string();

		assert_eq!(url(&["identities", "101"]), "https://iga.example.com/api/identities/101");
		assert_eq!(
			url(&["identities", "x/../.."]),
			"https://iga.example.com/api/identities/x%2F..%2F.."
		);
		assert_eq!(url(&["identities", "a?b=1"]), "https://iga.example.com/api/identities/a%3Fb=1");
		assert_eq!(url(&["identities", "a#b"]), "https://iga.example.com/api/identities/a%23b");
	}

	#[test]
	fn resource_url_rejects_dot_segments() {
		let config = ClientConfig::new("https://iga.example.com/api", SecretString::new("t".into()));
		for id in ["", ".", ".."] {
			assert!(matches!(
				config.resource_url(&["identities", id]),
				Err(ProviderError::Malformed(_))
			));
		}
	}

	#[test]
	fn config_debug_hides_token() {
		let config = ClientConfig::new("https://graph.example.com", SecretString::new("hunter2".into()));
		assert!(!format!("{config:?}").contains("hunter2"));
	}

	#[test]
	fn auth_failures_are_unauthorized() {
		assert_eq!(
			error_for_status(StatusCode::UNAUTHORIZED, None, ""),
			ProviderError::Unauthorized
		);
		assert_eq!(
			error_for_status(StatusCode::FORBIDDEN, None, "denied"),
			ProviderError::Unauthorized
		);
	}

	#[test]
	fn throttling_carries_retry_after() {
		let err = error_for_status(
			StatusCode::TOO_MANY_REQUESTS,
			Some(Duration::from_secs(3)),
			"",
		);
		assert_eq!(
			err,
			ProviderError::RateLimited {
				retry_after: Some(Duration::from_secs(3))
			}
		);
	}

	#[test]
	fn server_errors_are_transient() {
		for status in [
			StatusCode::INTERNAL_SERVER_ERROR,
			StatusCode::BAD_GATEWAY,
			StatusCode::SERVICE_UNAVAILABLE,
			StatusCode::REQUEST_TIMEOUT,
		] {
			assert!(matches!(
				error_for_status(status, None, ""),
				ProviderError::Transient(_)
			));
		}
	}

	#[test]
	fn status_retryability_is_decided_by_provider_error() {
		use idsync_common_http::RetryableError;

		let retryable = |status| error_for_status(status, None, "").is_retryable();
		assert!(retryable(StatusCode::TOO_MANY_REQUESTS));
		assert!(retryable(StatusCode::REQUEST_TIMEOUT));
		assert!(retryable(StatusCode::GATEWAY_TIMEOUT));
		assert!(!retryable(StatusCode::UNAUTHORIZED));
		assert!(!retryable(StatusCode::NOT_FOUND));
		assert!(!retryable(StatusCode::CONFLICT));
	}

	#[test]
	fn other_client_errors_are_malformed() {
		let err = error_for_status(StatusCode::BAD_REQUEST, None, "missing userName");
		assert_eq!(
			err,
			ProviderError::Malformed("HTTP 400 Bad Request: missing userName".to_string())
		);
	}
}
