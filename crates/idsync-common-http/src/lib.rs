// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for idsync.
//!
//! This crate provides:
//! - A pre-configured HTTP client builder with a consistent User-Agent header
//! - Retry logic with exponential backoff for transient provider failures

mod client;
mod retry;

pub use client::{builder, user_agent};
pub use retry::{backoff_delay, retry, retry_delay, RetryConfig, RetryableError};
