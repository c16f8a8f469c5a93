// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Settings encryption configuration.

use serde::Deserialize;
use warden_common_secret::SecretString;

/// Application-level salt for master key derivation. Changing it makes every
/// stored ciphertext unreadable.
pub const DEFAULT_KDF_SALT: &str = "warden.settings.kdf.v1";

#[derive(Debug, Clone)]
pub struct SecretsConfig {
	/// Master secret the settings encryption key is derived from. Required.
	pub master_key: Option<SecretString>,
	pub kdf_salt: String,
	/// Decrypted settings cache lifetime; 0 disables caching.
	pub cache_ttl_secs: u64,
}

impl Default for SecretsConfig {
	fn default() -> Self {
		SecretsConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretsConfigLayer {
	#[serde(default)]
	pub master_key: Option<SecretString>,
	#[serde(default)]
	pub kdf_salt: Option<String>,
	#[serde(default)]
	pub cache_ttl_secs: Option<u64>,
}

impl SecretsConfigLayer {
	pub fn merge(&mut self, other: SecretsConfigLayer) {
		if other.master_key.is_some() {
			self.master_key = other.master_key;
		}
		if other.kdf_salt.is_some() {
			self.kdf_salt = other.kdf_salt;
		}
		if other.cache_ttl_secs.is_some() {
			self.cache_ttl_secs = other.cache_ttl_secs;
		}
	}

	pub fn finalize(self) -> SecretsConfig {
		SecretsConfig {
			master_key: self.master_key,
			kdf_salt: self
				.kdf_salt
				.unwrap_or_else(|| DEFAULT_KDF_SALT.to_string()),
			cache_ttl_secs: self.cache_ttl_secs.unwrap_or(300),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = SecretsConfig::default();
		assert!(config.master_key.is_none());
		assert_eq!(config.kdf_salt, DEFAULT_KDF_SALT);
		assert_eq!(config.cache_ttl_secs, 300);
	}

	#[test]
	fn cache_can_be_disabled() {
		let config = SecretsConfigLayer {
			cache_ttl_secs: Some(0),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.cache_ttl_secs, 0);
	}
}
