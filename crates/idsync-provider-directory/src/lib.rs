// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Cloud directory provider for idsync.
//!
//! Speaks a Graph-style REST dialect: OData collections paged with
//! `@odata.nextLink`, and per-user MFA enforcement read and written through
//! `/users/{id}/authentication/requirements`.

pub mod client;
pub mod types;

pub use client::DirectoryClient;
pub use idsync_core::http::ClientConfig;
