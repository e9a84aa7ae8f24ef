// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

pub mod error;
pub mod http;
pub mod identity;
pub mod operation;
pub mod provider;
pub mod report;

pub use error::*;
pub use identity::*;
pub use operation::*;
pub use provider::*;
pub use report::*;
