// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Governance API client implementation.

use async_trait::async_trait;
use idsync_core::http::{self, ClientConfig};
use idsync_core::{
	FieldChange, Identity, IdentityProvider, IdentitySet, ProviderError, ProviderKind,
};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::types::{GovernanceIdentity, IdentityPatch};

const DEFAULT_PAGE_SIZE: usize = 250;

/// Total row count some tenants return alongside a page.
const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// Client for an identity governance platform's `/identities` API.
///
/// The governance system is normally the source of truth. It has no notion
/// of MFA, so `set_mfa` is the trait's no-op.
#[derive(Debug, Clone)]
pub struct GovernanceClient {
	name: String,
	http_client: Client,
	config: ClientConfig,
	page_size: usize,
}

impl GovernanceClient {
	pub fn new(name: impl Into<String>, config: ClientConfig) -> Result<Self, reqwest::Error> {
		Ok(Self {
			name: name.into(),
			http_client: config.build_client()?,
			config,
			page_size: DEFAULT_PAGE_SIZE,
		})
	}

	/// Sets the `limit` requested per page.
	pub fn with_page_size(mut self, page_size: usize) -> Self {
		self.page_size = page_size.max(1);
		self
	}

	fn identity_url(&self, id: &str) -> Result<Url, ProviderError> {
		self.config.resource_url(&["identities", id])
	}

	async fn get_identity(&self, id: &str) -> Result<Identity, ProviderError> {
		let request = self
			.http_client
			.get(self.identity_url(id)?)
			.header("Authorization", self.config.token.bearer_header());
		let response = http::send_checked(request).await?;
		let record: GovernanceIdentity = http::read_json(response).await?;
		Ok(record.into_identity())
	}
}

#[async_trait]
impl IdentityProvider for GovernanceClient {
	fn name(&self) -> &str {
		&self.name
	}

	fn kind(&self) -> ProviderKind {
		ProviderKind::Governance
	}

	/// Pages with `offset`/`limit` until an empty page or the advertised
	/// total. The server may cap `limit`, so a short page is not the end.
	#[instrument(skip(self), fields(provider = %self.name))]
	async fn fetch_identities(&self) -> Result<IdentitySet, ProviderError> {
		let url = self.config.endpoint("identities");
		let mut identities = Vec::new();
		let mut previous: Vec<String> = Vec::new();
		let mut offset = 0usize;

		loop {
			debug!(offset, limit = self.page_size, "fetching identity page");
			let request = self
				.http_client
				.get(&url)
				.header("Authorization", self.config.token.bearer_header())
				.query(&[("offset", offset), ("limit", self.page_size)]);
			let response = http::send_checked(request).await?;
			let total = total_count(response.headers());
			let page: Vec<GovernanceIdentity> = http::read_json(response).await?;

			if page.is_empty() {
				break;
			}
			let ids: Vec<String> = page.iter().map(|record| record.id.clone()).collect();
			if ids == previous {
				warn!(offset, "server returned the previous page again, ignoring offset");
				break;
			}

			offset += page.len();
			identities.extend(page.into_iter().map(GovernanceIdentity::into_identity));
			previous = ids;
			if total.is_some_and(|total| offset >= total) {
				break;
			}
		}

		info!(count = identities.len(), "fetched governance identities");
		Ok(IdentitySet::from_identities(identities))
	}

	#[instrument(skip(self, identity), fields(provider = %self.name, id = %identity.id()))]
	async fn create_identity(&self, identity: &Identity) -> Result<Identity, ProviderError> {
		let request = self
			.http_client
			.post(self.config.endpoint("identities"))
			.header("Authorization", self.config.token.bearer_header())
			.json(&GovernanceIdentity::from(identity));
		let response = http::send(request).await?;

		if response.status() == StatusCode::CONFLICT {
			debug!("identity already exists, fetching it");
			return self.get_identity(identity.id()).await;
		}
		if !response.status().is_success() {
			return Err(http::error_for_response(response).await);
		}

		let record: GovernanceIdentity = http::read_json(response).await?;
		Ok(record.into_identity())
	}

	#[instrument(skip(self, changes), fields(provider = %self.name))]
	async fn update_identity(&self, id: &str, changes: &[FieldChange]) -> Result<(), ProviderError> {
		let request = self
			.http_client
			.patch(self.identity_url(id)?)
			.header("Authorization", self.config.token.bearer_header())
			.json(&IdentityPatch::from_changes(changes));
		http::send_checked(request).await?;
		Ok(())
	}

	#[instrument(skip(self), fields(provider = %self.name))]
	async fn delete_identity(&self, id: &str) -> Result<(), ProviderError> {
		let request = self
			.http_client
			.delete(self.identity_url(id)?)
			.header("Authorization", self.config.token.bearer_header());
		let response = http::send(request).await?;

		match response.status() {
			StatusCode::NOT_FOUND => {
				debug!("identity already absent");
				Ok(())
			}
			status if status.is_success() => Ok(()),
			_ => Err(http::error_for_response(response).await),
		}
	}
}

fn total_count(headers: &HeaderMap) -> Option<usize> {
	headers
		.get(TOTAL_COUNT_HEADER)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.trim().parse().ok())
}
