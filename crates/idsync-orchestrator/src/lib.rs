// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Sync orchestrator.
//!
//! Fetches the source snapshot once, then runs one worker task per target.
//! Each worker fetches its target, reconciles against the shared read-only
//! source snapshot and executes the resulting operations in order with
//! bounded retry. Outcomes land in a per-target [`SyncReport`]; the run's
//! [`RunReport`] aggregates them.
//!
//! [`SyncReport`]: idsync_core::SyncReport
//! [`RunReport`]: idsync_core::RunReport

pub mod config;
pub mod execute;
mod orchestrator;

pub use config::{OrchestratorConfig, SyncTarget, DEFAULT_CALL_TIMEOUT};
pub use execute::OperationState;
pub use idsync_common_http::RetryConfig;
pub use orchestrator::{SyncOrchestrator, TargetPlan};
pub use tokio_util::sync::CancellationToken;
