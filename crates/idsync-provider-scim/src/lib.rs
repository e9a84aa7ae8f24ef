// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! SCIM 2.0 provider for idsync.

pub mod client;
pub mod types;

pub use client::ScimClient;
pub use idsync_core::http::ClientConfig;
pub use types::{ListResponse, PatchOp, PatchOperation, PatchRequest, ScimUser};
