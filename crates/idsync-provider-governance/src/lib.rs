// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Identity governance (IGA) provider for idsync.
//!
//! Talks to a governance platform's REST API:
//!
//! - `GET /identities?offset&limit`, paged until a short page
//! - `POST /identities`, where 409 resolves to the existing record
//! - `PATCH /identities/{id}`
//! - `DELETE /identities/{id}`, where 404 counts as success

pub mod client;
pub mod types;

pub use client::GovernanceClient;
pub use idsync_core::http::ClientConfig;
pub use types::{GovernanceIdentity, IdentityPatch};
