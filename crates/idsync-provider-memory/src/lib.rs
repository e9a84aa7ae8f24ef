// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory identity provider.
//!
//! Holds its records in a process-local store and honours the same contract
//! as the HTTP providers, including idempotent create and delete. Faults and
//! latency can be scripted per call so orchestration behaviour can be
//! exercised without a network.

pub mod fixtures;

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use idsync_core::{FieldChange, Identity, IdentityProvider, IdentitySet, ProviderError, ProviderKind};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

pub use fixtures::{Fixture, UnknownFixture};

/// Provider call, as recorded in the call log and matched by faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
	Fetch,
	Create,
	Update,
	Delete,
	SetMfa,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
	pub kind: CallKind,
	pub id: Option<String>,
}

#[derive(Debug, Clone)]
struct Fault {
	call: CallKind,
	id: Option<String>,
	error: ProviderError,
	/// `None` fails forever.
	remaining: Option<u32>,
}

impl Fault {
	fn matches(&self, call: CallKind, id: Option<&str>) -> bool {
		self.call == call && (self.id.is_none() || self.id.as_deref() == id)
	}
}

#[derive(Debug, Default)]
struct State {
	identities: BTreeMap<String, Identity>,
	faults: VecDeque<Fault>,
	calls: Vec<Call>,
}

pub struct InMemoryProvider {
	name: String,
	supports_mfa: bool,
	latency: Duration,
	state: Mutex<State>,
}

impl InMemoryProvider {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			supports_mfa: false,
			latency: Duration::ZERO,
			state: Mutex::new(State::default()),
		}
	}

	pub fn with_fixture(name: impl Into<String>, fixture: Fixture) -> Self {
		let provider = Self::new(name).with_identities(fixture.identities());
		match fixture {
			Fixture::Directory => provider.with_mfa_support(true),
			_ => provider,
		}
	}

	pub fn with_identities(mut self, identities: impl IntoIterator<Item = Identity>) -> Self {
		let state = self.state.get_mut();
		for identity in identities {
			state
				.identities
				.entry(identity.id().to_string())
				.or_insert(identity);
		}
		self
	}

	/// Whether `set_mfa` changes stored state. Without it MFA flags are dropped.
	pub fn with_mfa_support(mut self, supports_mfa: bool) -> Self {
		self.supports_mfa = supports_mfa;
		self
	}

	/// Delay applied before every call.
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = latency;
		self
	}

	/// Makes the next `times` matching calls fail with `error`.
	///
	/// `id` of `None` matches any identifier. Faults are consumed in the order
	/// they were added.
	pub async fn fail(&self, call: CallKind, id: Option<&str>, error: ProviderError, times: u32) {
		self.push_fault(call, id, error, Some(times)).await;
	}

	/// Makes every matching call fail with `error`.
	pub async fn fail_always(&self, call: CallKind, id: Option<&str>, error: ProviderError) {
		self.push_fault(call, id, error, None).await;
	}

	async fn push_fault(
		&self,
		call: CallKind,
		id: Option<&str>,
		error: ProviderError,
		remaining: Option<u32>,
	) {
		self.state.lock().await.faults.push_back(Fault {
			call,
			id: id.map(str::to_string),
			error,
			remaining,
		});
	}

	pub async fn snapshot(&self) -> IdentitySet {
		let state = self.state.lock().await;
		IdentitySet::from_identities(state.identities.values().cloned())
	}

	/// Every call made so far, including failed ones.
	pub async fn calls(&self) -> Vec<Call> {
		self.state.lock().await.calls.clone()
	}

	pub async fn call_count(&self, kind: CallKind) -> usize {
		self.state
			.lock()
			.await
			.calls
			.iter()
			.filter(|c| c.kind == kind)
			.count()
	}

	/// Records the call, then sleeps and consults the fault script.
	async fn enter(&self, kind: CallKind, id: Option<&str>) -> Result<(), ProviderError> {
		self.state.lock().await.calls.push(Call {
			kind,
			id: id.map(str::to_string),
		});

		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}

		let mut state = self.state.lock().await;
		let Some(index) = state.faults.iter().position(|f| f.matches(kind, id)) else {
			return Ok(());
		};

		let fault = &mut state.faults[index];
		let error = fault.error.clone();
		if let Some(remaining) = fault.remaining.as_mut() {
			*remaining = remaining.saturating_sub(1);
			if *remaining == 0 {
				state.faults.remove(index);
			}
		}
		debug!(provider = %self.name, ?kind, id, error = %error, "injected fault");
		Err(error)
	}

	fn stored(&self, identity: &Identity) -> Identity {
		if self.supports_mfa {
			let mfa = identity.mfa_enabled().unwrap_or(false);
			identity.clone().with_mfa(Some(mfa))
		} else {
			identity.clone().with_mfa(None)
		}
	}
}

#[async_trait]
impl IdentityProvider for InMemoryProvider {
	fn name(&self) -> &str {
		&self.name
	}

	fn kind(&self) -> ProviderKind {
		ProviderKind::Memory
	}

	fn supports_mfa(&self) -> bool {
		self.supports_mfa
	}

	#[instrument(skip(self), fields(provider = %self.name))]
	async fn fetch_identities(&self) -> Result<IdentitySet, ProviderError> {
		self.enter(CallKind::Fetch, None).await?;
		Ok(self.snapshot().await)
	}

	#[instrument(skip(self, identity), fields(provider = %self.name, id = %identity.id()))]
	async fn create_identity(&self, identity: &Identity) -> Result<Identity, ProviderError> {
		self.enter(CallKind::Create, Some(identity.id())).await?;
		let stored = self.stored(identity);
		let mut state = self.state.lock().await;
		let existing = state
			.identities
			.entry(identity.id().to_string())
			.or_insert(stored);
		Ok(existing.clone())
	}

	#[instrument(skip(self, changes), fields(provider = %self.name))]
	async fn update_identity(&self, id: &str, changes: &[FieldChange]) -> Result<(), ProviderError> {
		self.enter(CallKind::Update, Some(id)).await?;
		let mut state = self.state.lock().await;
		let current = state
			.identities
			.get_mut(id)
			.ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
		*current = current.with_changes(changes);
		Ok(())
	}

	#[instrument(skip(self), fields(provider = %self.name))]
	async fn delete_identity(&self, id: &str) -> Result<(), ProviderError> {
		self.enter(CallKind::Delete, Some(id)).await?;
		if self.state.lock().await.identities.remove(id).is_none() {
			debug!(id, "identity already absent");
		}
		Ok(())
	}

	#[instrument(skip(self), fields(provider = %self.name))]
	async fn set_mfa(&self, id: &str, enabled: bool) -> Result<(), ProviderError> {
		self.enter(CallKind::SetMfa, Some(id)).await?;
		if !self.supports_mfa {
			debug!(id, "MFA not supported, ignoring");
			return Ok(());
		}
		let mut state = self.state.lock().await;
		let current = state
			.identities
			.get_mut(id)
			.ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
		*current = current.clone().with_mfa(Some(enabled));
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn create_returns_existing_record() {
		let provider = InMemoryProvider::with_fixture("sailpoint", Fixture::Governance);
		let created = provider
			.create_identity(&Identity::new("101", "Someone Else"))
			.await
			.unwrap();
		assert_eq!(created.display_name(), "Priya");
		assert_eq!(provider.snapshot().await.len(), 2);
	}

	#[tokio::test]
	async fn delete_of_missing_identity_succeeds() {
		let provider = InMemoryProvider::new("jira");
		provider.delete_identity("404").await.unwrap();
		provider.delete_identity("404").await.unwrap();
	}

	#[tokio::test]
	async fn update_of_missing_identity_is_not_found() {
		let provider = InMemoryProvider::new("jira");
		let err = provider.update_identity("999", &[]).await.unwrap_err();
		assert_eq!(err, ProviderError::NotFound("999".to_string()));
	}

	#[tokio::test]
	async fn set_mfa_updates_directory_state() {
		let provider = InMemoryProvider::with_fixture("entra", Fixture::Directory);
		provider.set_mfa("202", true).await.unwrap();
		let snapshot = provider.snapshot().await;
		assert_eq!(snapshot.get("202").unwrap().mfa_enabled(), Some(true));
	}

	#[tokio::test]
	async fn set_mfa_is_noop_without_support() {
		let provider = InMemoryProvider::with_fixture("sailpoint", Fixture::Governance);
		provider.set_mfa("101", true).await.unwrap();
		assert_eq!(provider.snapshot().await.get("101").unwrap().mfa_enabled(), None);
	}

	#[tokio::test]
	async fn mfa_capable_store_defaults_new_users_to_disabled() {
		let provider = InMemoryProvider::new("entra").with_mfa_support(true);
		let created = provider
			.create_identity(&Identity::new("101", "Priya"))
			.await
			.unwrap();
		assert_eq!(created.mfa_enabled(), Some(false));
	}

	#[tokio::test]
	async fn scripted_fault_fires_requested_number_of_times() {
		let provider = InMemoryProvider::new("salesforce");
		provider
			.fail(CallKind::Create, Some("101"), ProviderError::transient("503"), 2)
			.await;
		let priya = Identity::new("101", "Priya");

		assert!(provider.create_identity(&priya).await.is_err());
		assert!(provider.create_identity(&Identity::new("102", "Ravi")).await.is_ok());
		assert!(provider.create_identity(&priya).await.is_err());
		assert!(provider.create_identity(&priya).await.is_ok());
		assert_eq!(provider.call_count(CallKind::Create).await, 4);
	}

	#[tokio::test]
	async fn permanent_fault_never_clears() {
		let provider = InMemoryProvider::new("entra");
		provider
			.fail_always(CallKind::Fetch, None, ProviderError::Unauthorized)
			.await;
		for _ in 0..3 {
			assert_eq!(
				provider.fetch_identities().await.unwrap_err(),
				ProviderError::Unauthorized
			);
		}
	}

	#[tokio::test(start_paused = true)]
	async fn latency_delays_each_call() {
		let provider = InMemoryProvider::new("jira").with_latency(Duration::from_secs(2));
		let started = tokio::time::Instant::now();
		provider.fetch_identities().await.unwrap();
		assert!(started.elapsed() >= Duration::from_secs(2));
	}
}
