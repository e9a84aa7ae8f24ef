// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret wrapper for provider bearer tokens.
//!
//! Tokens handed to provider clients are wrapped in [`Secret<T>`] so they:
//!
//! - Never appear in logs (redacted Debug/Display)
//! - Never serialize to plain text (a config dump prints `[REDACTED]`)
//! - Are zeroized from memory on drop
//! - Require an explicit `.expose()` call at the point the `Authorization`
//!   header is built
//!
//! ```
//! use idsync_common_secret::Secret;
//!
//! let token = Secret::new("eyJhbGciOi...".to_string());
//! assert_eq!(format!("{token}"), "[REDACTED]");
//! assert_eq!(token.expose(), "eyJhbGciOi...");
//! ```

pub mod credential;

use std::fmt;
use zeroize::Zeroize;

pub use credential::{load_secret_env, CredentialError, CredentialRef};

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

/// A wrapper for sensitive values that prevents accidental exposure.
///
/// There is no `Deref` impl; callers must go through [`Secret::expose`].
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Bearer tokens and other string secrets.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Explicitly access the inner value.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl SecretString {
	/// Formats the value of an HTTP `Authorization` header.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.inner)
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

impl<T> serde::Serialize for Secret<T>
where
	T: Zeroize,
{
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de, T> serde::Deserialize<'de> for Secret<T>
where
	T: serde::Deserialize<'de> + Zeroize,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		T::deserialize(deserializer).map(Secret::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn debug_is_redacted() {
		let secret = Secret::new("sailpoint-pat-123".to_string());
		let out = format!("{secret:?}");
		assert!(!out.contains("sailpoint-pat-123"));
		assert!(out.contains(REDACTED));
	}

	#[test]
	fn display_is_redacted() {
		let secret = Secret::new("entra-token".to_string());
		assert_eq!(format!("{secret}"), REDACTED);
	}

	#[test]
	fn bearer_header_exposes_token_only_in_header() {
		let secret = Secret::new("abc".to_string());
		assert_eq!(secret.bearer_header(), "Bearer abc");
	}

	/// A config dump must never contain the token.
	#[test]
	fn serialize_is_redacted() {
		let secret = Secret::new("scim-bearer".to_string());
		let json = serde_json::to_string(&secret).unwrap();
		assert_eq!(json, format!("\"{REDACTED}\""));
	}

	#[test]
	fn deserialize_populates_secret() {
		let secret: SecretString = serde_json::from_str(r#""tok""#).unwrap();
		assert_eq!(secret.expose(), "tok");
	}

	proptest! {
		#[test]
		fn formatting_never_leaks(value in "[a-zA-Z0-9]{8,64}") {
			let secret = Secret::new(value.clone());
			let debug = format!("{:?}", secret);
			let display = format!("{}", secret);
			prop_assert!(!debug.contains(&value));
			prop_assert!(!display.contains(&value));
		}
	}
}
