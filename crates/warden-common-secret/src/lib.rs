// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wrapper for values that must never reach a log line, a config dump, or an
//! HTTP response by accident.
//!
//! Warden keeps three kinds of material in [`Secret`]: the token signing key,
//! the settings master key, and decrypted third-party credentials handed out by
//! the settings service. Bearer tokens captured for impersonation restore are
//! wrapped too.
//!
//! ```
//! use warden_common_secret::SecretString;
//!
//! let key = SecretString::new("sk_live_abc".to_string());
//! assert_eq!(format!("{key}"), "[REDACTED]");
//! assert_eq!(format!("{key:?}"), "Secret(\"[REDACTED]\")");
//! assert_eq!(key.expose(), "sk_live_abc");
//! ```
//!
//! `tracing::Value` is sealed, so structured logging relies on the redacted
//! `Display` (`%secret`) and `Debug` (`?secret`) impls below.

use std::fmt;
use zeroize::Zeroize;

/// Placeholder written wherever a secret would otherwise be printed.
pub const REDACTED: &str = "[REDACTED]";

/// A sensitive value. No `Deref`; call [`Secret::expose`] to read it.
///
/// The inner value is zeroized when the wrapper is dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Read the wrapped value. Every call site is a place a secret leaves the
	/// wrapper, so keep them few.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	/// Clone the inner value out. The original stays zeroize-on-drop.
	pub fn into_inner(self) -> T
	where
		T: Clone,
	{
		self.inner.clone()
	}
}

impl SecretString {
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
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

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	// Serializes as the placeholder, so a config or response dump stays clean.
	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn signing_key_is_redacted_in_debug_and_display() {
		let key = SecretString::from("hmac-signing-key-0123456789abcdef");
		assert_eq!(format!("{key}"), REDACTED);
		assert!(!format!("{key:?}").contains("hmac-signing-key"));
	}

	#[test]
	fn expose_and_into_inner_return_value() {
		let token = SecretString::from("eyJzdWIiOiJ4In0.c2ln");
		assert_eq!(token.expose(), "eyJzdWIiOiJ4In0.c2ln");
		assert_eq!(token.clone().into_inner(), "eyJzdWIiOiJ4In0.c2ln");
	}

	#[test]
	fn option_of_secret_stays_redacted() {
		let maybe: Option<SecretString> = Some("sk_live_abc".into());
		let debug = format!("{maybe:?}");
		assert!(debug.contains(REDACTED));
		assert!(!debug.contains("sk_live_abc"));
	}

	#[test]
	fn equality_compares_inner() {
		assert_eq!(SecretString::from("a"), SecretString::from("a"));
		assert_ne!(SecretString::from("a"), SecretString::from("b"));
	}

	#[test]
	fn length_helpers() {
		let empty = SecretString::from("");
		assert!(empty.is_empty());
		assert_eq!(SecretString::from("abcd").len(), 4);
	}

	#[cfg(feature = "serde")]
	#[test]
	fn serialize_writes_placeholder_and_deserialize_reads_value() {
		let json = serde_json::to_string(&SecretString::from("sk_live_abc")).unwrap();
		assert_eq!(json, format!("\"{REDACTED}\""));

		let parsed: SecretString = serde_json::from_str("\"sk_live_abc\"").unwrap();
		assert_eq!(parsed.expose(), "sk_live_abc");
	}

	proptest! {
		#[test]
		fn formatting_never_leaks(inner in "[a-zA-Z0-9_.-]{4,64}") {
			prop_assume!(!REDACTED.contains(&inner) && !"Secret".contains(&inner));
			let secret = SecretString::new(inner.clone());
			let displayed = format!("{secret}");
			let debugged = format!("{secret:?}");
			prop_assert!(!displayed.contains(&inner));
			prop_assert!(!debugged.contains(&inner));
		}
	}
}
