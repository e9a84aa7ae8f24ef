// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry logic with exponential backoff.

use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	/// Total attempts including the first one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryConfig {
	/// A config that never waits; used by tests and dry runs.
	pub fn immediate(max_attempts: u32) -> Self {
		Self {
			max_attempts,
			base_delay: Duration::ZERO,
			max_delay: Duration::ZERO,
			backoff_factor: 1.0,
			jitter: false,
		}
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;

	/// Server-provided wait hint (e.g. `Retry-After`).
	fn retry_after(&self) -> Option<Duration> {
		None
	}
}

/// Delay before retry number `attempt` (0-based), before any server hint.
pub fn backoff_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential_delay = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped_delay = exponential_delay.min(cfg.max_delay.as_secs_f64());

	let final_delay = if cfg.jitter {
		let jitter_factor = 0.5 + fastrand::f64();
		capped_delay * jitter_factor
	} else {
		capped_delay
	};

	Duration::from_secs_f64(final_delay)
}

/// Backoff raised to the server hint, never past `max_delay`.
pub fn retry_delay<E: RetryableError>(cfg: &RetryConfig, attempt: u32, err: &E) -> Duration {
	let delay = backoff_delay(cfg, attempt);
	match err.retry_after() {
		Some(hint) if hint > delay => hint.min(cfg.max_delay),
		_ => delay,
	}
}

pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let mut attempt = 0;

	loop {
		match f().await {
			Ok(result) => return Ok(result),
			Err(err) => {
				attempt += 1;

				if !err.is_retryable() {
					warn!(
							error = ?err,
							attempt = attempt,
							"non-retryable error encountered"
					);
					return Err(err);
				}

				if attempt >= cfg.max_attempts {
					warn!(
							error = ?err,
							attempt = attempt,
							max_attempts = cfg.max_attempts,
							"max retry attempts exhausted"
					);
					return Err(err);
				}

				let delay = retry_delay(cfg, attempt - 1, &err);
				warn!(
						error = ?err,
						attempt = attempt,
						max_attempts = cfg.max_attempts,
						delay_ms = delay.as_millis(),
						"retrying after error"
				);

				tokio::time::sleep(delay).await;
			}
		}
	}
}
