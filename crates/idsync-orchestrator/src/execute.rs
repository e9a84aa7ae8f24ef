// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Per-operation execution state machine.
//!
//! ```text
//! Pending -> Attempting -> [RetryWait -> Attempting]* -> Succeeded | Failed
//! ```
//!
//! Cancellation is observed only in `RetryWait`. An in-flight call always
//! runs to completion (bounded by the call timeout); a pending wait is
//! abandoned and the operation fails with the last error it saw.

use std::future::Future;
use std::time::Duration;

use idsync_common_http::{retry_delay, RetryableError};
use idsync_core::{IdentityProvider, IdentitySet, ProviderError, SyncOperation, SyncResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::OrchestratorConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum OperationState {
	Pending,
	Attempting {
		attempt: u32,
	},
	RetryWait {
		attempt: u32,
		delay: Duration,
		last_error: ProviderError,
	},
	Succeeded {
		attempts: u32,
	},
	Failed {
		attempts: u32,
		error: ProviderError,
	},
}

impl OperationState {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OperationState::Succeeded { .. } | OperationState::Failed { .. }
		)
	}

	/// Next state after a call made in `Attempting { attempt }` returned.
	pub fn after_attempt(
		attempt: u32,
		outcome: Result<(), ProviderError>,
		config: &OrchestratorConfig,
	) -> OperationState {
		match outcome {
			Ok(()) => OperationState::Succeeded { attempts: attempt },
			Err(error) if error.is_retryable() && attempt < config.retry.max_attempts => {
				OperationState::RetryWait {
					attempt,
					delay: retry_delay(&config.retry, attempt - 1, &error),
					last_error: error,
				}
			}
			Err(error) => OperationState::Failed {
				attempts: attempt,
				error,
			},
		}
	}

	/// Converts a terminal state into a report result and attempt count.
	pub fn into_result(self) -> Option<(SyncResult, u32)> {
		match self {
			OperationState::Succeeded { attempts } => Some((SyncResult::Succeeded, attempts)),
			OperationState::Failed { attempts, error } => {
				Some((SyncResult::failed(&error), attempts))
			}
			_ => None,
		}
	}
}

/// Runs one operation to a terminal state.
pub async fn drive(
	provider: &dyn IdentityProvider,
	operation: &SyncOperation,
	config: &OrchestratorConfig,
	cancel: &CancellationToken,
) -> OperationState {
	let mut state = OperationState::Pending;

	loop {
		state = match state {
			OperationState::Pending => OperationState::Attempting { attempt: 1 },
			OperationState::Attempting { attempt } => {
				debug!(%operation, attempt, "attempting operation");
				let outcome = timed(config.call_timeout, apply(provider, operation)).await;
				OperationState::after_attempt(attempt, outcome, config)
			}
			OperationState::RetryWait {
				attempt,
				delay,
				last_error,
			} => {
				warn!(
					%operation,
					attempt,
					max_attempts = config.retry.max_attempts,
					delay_ms = delay.as_millis() as u64,
					error = %last_error,
					"retrying after error"
				);
				tokio::select! {
					_ = cancel.cancelled() => {
						warn!(%operation, attempt, "run stopped during retry wait, abandoning");
						OperationState::Failed { attempts: attempt, error: last_error }
					}
					_ = tokio::time::sleep(delay) => OperationState::Attempting { attempt: attempt + 1 },
				}
			}
			terminal => return terminal,
		};
	}
}

async fn apply(provider: &dyn IdentityProvider, operation: &SyncOperation) -> Result<(), ProviderError> {
	match operation {
		SyncOperation::Create { identity } => provider.create_identity(identity).await.map(|_| ()),
		SyncOperation::Update { id, changes } => provider.update_identity(id, changes).await,
		SyncOperation::EnableMfa { id } => provider.set_mfa(id, true).await,
		SyncOperation::Delete { id } => provider.delete_identity(id).await,
	}
}

/// Bounds a provider call. An elapsed timeout is transient.
pub async fn timed<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
	F: Future<Output = Result<T, ProviderError>>,
{
	match tokio::time::timeout(limit, call).await {
		Ok(result) => result,
		Err(_) => Err(ProviderError::transient(format!(
			"call timed out after {}ms",
			limit.as_millis()
		))),
	}
}

/// Fetches a snapshot with the configured retry policy and call timeout.
///
/// Follows the same rules as [`drive`]: a stop seen during a retry wait
/// abandons the fetch with the last error instead of issuing another call.
pub async fn fetch_snapshot(
	provider: &dyn IdentityProvider,
	config: &OrchestratorConfig,
	cancel: &CancellationToken,
) -> Result<IdentitySet, ProviderError> {
	let mut attempt = 0;
	loop {
		attempt += 1;
		let error = match timed(config.call_timeout, provider.fetch_identities()).await {
			Ok(snapshot) => return Ok(snapshot),
			Err(error) => error,
		};
		if !error.is_retryable() || attempt >= config.retry.max_attempts {
			return Err(error);
		}

		let delay = retry_delay(&config.retry, attempt - 1, &error);
		warn!(
			provider = %provider.name(),
			attempt,
			max_attempts = config.retry.max_attempts,
			delay_ms = delay.as_millis() as u64,
			error = %error,
			"fetch failed, retrying"
		);
		tokio::select! {
			_ = cancel.cancelled() => {
				warn!(provider = %provider.name(), attempt, "run stopped during fetch retry wait, abandoning");
				return Err(error);
			}
			_ = tokio::time::sleep(delay) => {}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use idsync_common_http::RetryConfig;

	fn config(max_attempts: u32) -> OrchestratorConfig {
		OrchestratorConfig {
			retry: RetryConfig::immediate(max_attempts),
			..Default::default()
		}
	}

	#[test]
	fn success_is_terminal() {
		let next = OperationState::after_attempt(1, Ok(()), &config(3));
		assert_eq!(next, OperationState::Succeeded { attempts: 1 });
		assert!(next.is_terminal());
	}

	#[test]
	fn transient_error_waits_when_attempts_remain() {
		let next = OperationState::after_attempt(1, Err(ProviderError::transient("503")), &config(3));
		assert!(matches!(next, OperationState::RetryWait { attempt: 1, .. }));
		assert!(!next.is_terminal());
	}

	#[test]
	fn transient_error_fails_on_last_attempt() {
		let next = OperationState::after_attempt(3, Err(ProviderError::transient("503")), &config(3));
		assert!(matches!(next, OperationState::Failed { attempts: 3, .. }));
	}

	#[test]
	fn permanent_error_fails_immediately() {
		let next = OperationState::after_attempt(1, Err(ProviderError::Unauthorized), &config(3));
		assert_eq!(
			next,
			OperationState::Failed {
				attempts: 1,
				error: ProviderError::Unauthorized
			}
		);
	}

	#[test]
	fn rate_limit_hint_sets_wait() {
		let cfg = OrchestratorConfig {
			retry: RetryConfig {
				jitter: false,
				..Default::default()
			},
			..Default::default()
		};
		let next = OperationState::after_attempt(
			1,
			Err(ProviderError::RateLimited {
				retry_after: Some(Duration::from_secs(2)),
			}),
			&cfg,
		);
		match next {
			OperationState::RetryWait { delay, .. } => assert_eq!(delay, Duration::from_secs(2)),
			other => panic!("expected RetryWait, got {other:?}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn timed_maps_elapsed_to_transient() {
		let result: Result<(), ProviderError> = timed(Duration::from_secs(1), async {
			tokio::time::sleep(Duration::from_secs(5)).await;
			Ok(())
		})
		.await;
		assert!(matches!(result, Err(ProviderError::Transient(_))));
	}

	#[test]
	fn non_terminal_state_has_no_result() {
		assert_eq!(OperationState::Pending.into_result(), None);
	}
}
