// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Directory API client implementation.

use async_trait::async_trait;
use idsync_core::http::{self, ClientConfig};
use idsync_core::{
	FieldChange, Identity, IdentityProvider, IdentitySet, ProviderError, ProviderKind,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use crate::types::{patch_body, user_body, DirectoryUser, MfaRequirement, ODataPage, USER_SELECT};

/// Client for a Graph-style cloud directory.
///
/// Per-user MFA enforcement lives behind `users/{id}/authentication/requirements`,
/// separate from the user record, so a fetch reads the user collection and
/// then each user's requirement. That is the same resource `set_mfa` writes.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
	name: String,
	http_client: Client,
	config: ClientConfig,
}

impl DirectoryClient {
	pub fn new(name: impl Into<String>, config: ClientConfig) -> Result<Self, reqwest::Error> {
		Ok(Self {
			name: name.into(),
			http_client: config.build_client()?,
			config,
		})
	}

	fn user_url(&self, id: &str) -> Result<Url, ProviderError> {
		self.config.resource_url(&["users", id])
	}

	fn requirements_url(&self, id: &str) -> Result<Url, ProviderError> {
		self.config
			.resource_url(&["users", id, "authentication", "requirements"])
	}

	/// Reads every page of an OData collection, following `@odata.nextLink`.
	async fn collect_pages<T: DeserializeOwned>(
		&self,
		first: String,
		query: &[(&str, &str)],
	) -> Result<Vec<T>, ProviderError> {
		let mut items = Vec::new();
		let mut request = self.http_client.get(&first);
		if !query.is_empty() {
			request = request.query(query);
		}

		loop {
			let response = http::send_checked(
				request.header("Authorization", self.config.token.bearer_header()),
			)
			.await?;
			let page: ODataPage<T> = http::read_json(response).await?;
			items.extend(page.value);

			match page.next_link {
				Some(next) => {
					debug!(next = %next, "following nextLink");
					// nextLink already carries the query
					request = self.http_client.get(next);
				}
				None => break,
			}
		}

		Ok(items)
	}

	async fn mfa_enforced(&self, id: &str) -> Result<bool, ProviderError> {
		let request = self
			.http_client
			.get(self.requirements_url(id)?)
			.header("Authorization", self.config.token.bearer_header());
		let response = http::send_checked(request).await?;
		let requirement: MfaRequirement = http::read_json(response).await?;
		Ok(requirement.is_required())
	}

	async fn get_user(&self, id: &str) -> Result<Identity, ProviderError> {
		let request = self
			.http_client
			.get(self.user_url(id)?)
			.query(&[("$select", USER_SELECT)])
			.header("Authorization", self.config.token.bearer_header());
		let response = http::send_checked(request).await?;
		let user: DirectoryUser = http::read_json(response).await?;
		let enforced = self.mfa_enforced(&user.id).await?;
		Ok(user.into_identity(enforced))
	}
}

#[async_trait]
impl IdentityProvider for DirectoryClient {
	fn name(&self) -> &str {
		&self.name
	}

	fn kind(&self) -> ProviderKind {
		ProviderKind::Directory
	}

	fn supports_mfa(&self) -> bool {
		true
	}

	#[instrument(skip(self), fields(provider = %self.name))]
	async fn fetch_identities(&self) -> Result<IdentitySet, ProviderError> {
		let users: Vec<DirectoryUser> = self
			.collect_pages(self.config.endpoint("users"), &[("$select", USER_SELECT)])
			.await?;

		let mut identities = Vec::with_capacity(users.len());
		for user in users {
			let enforced = self.mfa_enforced(&user.id).await?;
			identities.push(user.into_identity(enforced));
		}

		info!(count = identities.len(), "fetched directory users");
		Ok(IdentitySet::from_identities(identities))
	}

	#[instrument(skip(self, identity), fields(provider = %self.name, id = %identity.id()))]
	async fn create_identity(&self, identity: &Identity) -> Result<Identity, ProviderError> {
		let request = self
			.http_client
			.post(self.config.endpoint("users"))
			.header("Authorization", self.config.token.bearer_header())
			.json(&user_body(identity));
		let response = http::send(request).await?;

		if response.status() == StatusCode::CONFLICT {
			debug!("user already exists, fetching it");
			return self.get_user(identity.id()).await;
		}
		if !response.status().is_success() {
			return Err(http::error_for_response(response).await);
		}

		let user: DirectoryUser = http::read_json(response).await?;
		Ok(user.into_identity(false))
	}

	#[instrument(skip(self, changes), fields(provider = %self.name))]
	async fn update_identity(&self, id: &str, changes: &[FieldChange]) -> Result<(), ProviderError> {
		let request = self
			.http_client
			.patch(self.user_url(id)?)
			.header("Authorization", self.config.token.bearer_header())
			.json(&patch_body(changes));
		http::send_checked(request).await?;
		Ok(())
	}

	#[instrument(skip(self), fields(provider = %self.name))]
	async fn delete_identity(&self, id: &str) -> Result<(), ProviderError> {
		let request = self
			.http_client
			.delete(self.user_url(id)?)
			.header("Authorization", self.config.token.bearer_header());
		let response = http::send(request).await?;

		match response.status() {
			StatusCode::NOT_FOUND => {
				debug!("user already absent");
				Ok(())
			}
			status if status.is_success() => Ok(()),
			_ => Err(http::error_for_response(response).await),
		}
	}

	#[instrument(skip(self), fields(provider = %self.name))]
	async fn set_mfa(&self, id: &str, enabled: bool) -> Result<(), ProviderError> {
		let request = self
			.http_client
			.patch(self.requirements_url(id)?)
			.header("Authorization", self.config.token.bearer_header())
			.json(&MfaRequirement::new(enabled));
		http::send_checked(request).await?;
		info!(id, enabled, "updated per-user MFA state");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn directory_supports_mfa() {
		let config = ClientConfig::new(
			"https://graph.example.com/v1.0",
			idsync_common_secret::SecretString::new("token".to_string()),
		);
		let client = DirectoryClient::new("entra", config).unwrap();
		assert!(client.supports_mfa());
		assert_eq!(client.kind(), ProviderKind::Directory);
		assert_eq!(
			client.user_url("202").unwrap().as_str(),
			"https://graph.example.com/v1.0/users/202"
		);
		assert_eq!(
			client.requirements_url("a/b").unwrap().as_str(),
			"https://graph.example.com/v1.0/users/a%2Fb/authentication/requirements"
		);
	}
}
