// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! SCIM 2.0 client implementation.

use async_trait::async_trait;
use idsync_core::http::{self, ClientConfig};
use idsync_core::{
	FieldChange, Identity, IdentityProvider, IdentitySet, ProviderError, ProviderKind,
};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::types::{escape_filter_value, ListResponse, PatchRequest, ScimUser};

const DEFAULT_PAGE_SIZE: usize = 100;
const SCIM_CONTENT_TYPE: &str = "application/scim+json";

/// SCIM 2.0 client for a downstream SaaS application.
///
/// Identities are matched on `externalId`, falling back to `userName`. The
/// server's own resource id is looked up whenever a call needs a
/// `/Users/{id}` path.
#[derive(Debug, Clone)]
pub struct ScimClient {
	name: String,
	http_client: Client,
	config: ClientConfig,
	page_size: usize,
}

impl ScimClient {
	pub fn new(name: impl Into<String>, config: ClientConfig) -> Result<Self, reqwest::Error> {
		Ok(Self {
			name: name.into(),
			http_client: config.build_client()?,
			config,
			page_size: DEFAULT_PAGE_SIZE,
		})
	}

	pub fn with_page_size(mut self, page_size: usize) -> Self {
		self.page_size = page_size.max(1);
		self
	}

	fn users_url(&self) -> String {
		self.config.endpoint("Users")
	}

	async fn query_users(&self, filter: &str) -> Result<Option<ScimUser>, ProviderError> {
		let request = self
			.http_client
			.get(self.users_url())
			.query(&[("filter", filter)])
			.header("Authorization", self.config.token.bearer_header())
			.header("Accept", SCIM_CONTENT_TYPE);
		let response = http::send_checked(request).await?;
		let list: ListResponse<ScimUser> = http::read_json(response).await?;
		Ok(list.resources.into_iter().next())
	}

	/// Finds the SCIM user for an identity identifier.
	pub async fn find_user(&self, id: &str) -> Result<Option<ScimUser>, ProviderError> {
		let escaped = escape_filter_value(id);
		if let Some(user) = self
			.query_users(&format!("externalId eq \"{escaped}\""))
			.await?
		{
			return Ok(Some(user));
		}
		self.query_users(&format!("userName eq \"{escaped}\"")).await
	}

	fn resource_url(&self, user: &ScimUser) -> Result<Url, ProviderError> {
		let scim_id = user
			.id
			.as_deref()
			.ok_or_else(|| ProviderError::malformed("SCIM user has no id"))?;
		self.config.resource_url(&["Users", scim_id])
	}
}

#[async_trait]
impl IdentityProvider for ScimClient {
	fn name(&self) -> &str {
		&self.name
	}

	fn kind(&self) -> ProviderKind {
		ProviderKind::Scim
	}

	#[instrument(skip(self), fields(provider = %self.name))]
	async fn fetch_identities(&self) -> Result<IdentitySet, ProviderError> {
		let mut identities = Vec::new();
		let mut start_index = 1usize;

		loop {
			debug!(start_index, count = self.page_size, "fetching SCIM users page");
			let request = self
				.http_client
				.get(self.users_url())
				.query(&[("startIndex", start_index), ("count", self.page_size)])
				.header("Authorization", self.config.token.bearer_header())
				.header("Accept", SCIM_CONTENT_TYPE);
			let response = http::send_checked(request).await?;
			let page: ListResponse<ScimUser> = http::read_json(response).await?;

			let fetched = page.resources.len();
			identities.extend(page.resources.into_iter().map(ScimUser::into_identity));
			if fetched == 0 || identities.len() as i64 >= page.total_results {
				break;
			}
			start_index += fetched;
		}

		info!(count = identities.len(), "fetched SCIM users");
		Ok(IdentitySet::from_identities(identities))
	}

	#[instrument(skip(self, identity), fields(provider = %self.name, id = %identity.id()))]
	async fn create_identity(&self, identity: &Identity) -> Result<Identity, ProviderError> {
		let request = self
			.http_client
			.post(self.users_url())
			.header("Authorization", self.config.token.bearer_header())
			.header("Content-Type", SCIM_CONTENT_TYPE)
			.body(
				serde_json::to_vec(&ScimUser::from_identity(identity))
					.map_err(|e| ProviderError::malformed(e.to_string()))?,
			);
		let response = http::send(request).await?;

		if response.status() == StatusCode::CONFLICT {
			debug!("user already exists, looking it up");
			return match self.find_user(identity.id()).await? {
				Some(user) => Ok(user.into_identity()),
				None => {
					warn!("conflict reported but no matching user found");
					Err(ProviderError::malformed(format!(
						"409 Conflict for '{}' but no matching user",
						identity.id()
					)))
				}
			};
		}
		if !response.status().is_success() {
			return Err(http::error_for_response(response).await);
		}

		let user: ScimUser = http::read_json(response).await?;
		Ok(user.into_identity())
	}

	#[instrument(skip(self, changes), fields(provider = %self.name))]
	async fn update_identity(&self, id: &str, changes: &[FieldChange]) -> Result<(), ProviderError> {
		let user = self
			.find_user(id)
			.await?
			.ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
		let body = serde_json::to_vec(&PatchRequest::from_changes(changes))
			.map_err(|e| ProviderError::malformed(e.to_string()))?;
		let request = self
			.http_client
			.patch(self.resource_url(&user)?)
			.header("Authorization", self.config.token.bearer_header())
			.header("Content-Type", SCIM_CONTENT_TYPE)
			.body(body);
		http::send_checked(request).await?;
		Ok(())
	}

	#[instrument(skip(self), fields(provider = %self.name))]
	async fn delete_identity(&self, id: &str) -> Result<(), ProviderError> {
		let Some(user) = self.find_user(id).await? else {
			debug!("user already absent");
			return Ok(());
		};
		let request = self
			.http_client
			.delete(self.resource_url(&user)?)
			.header("Authorization", self.config.token.bearer_header());
		let response = http::send(request).await?;

		match response.status() {
			StatusCode::NOT_FOUND => Ok(()),
			status if status.is_success() => Ok(()),
			_ => Err(http::error_for_response(response).await),
		}
	}
}
