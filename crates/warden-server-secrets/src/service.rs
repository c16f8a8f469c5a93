// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Settings service: the only way third-party credentials are read or written.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::instrument;
use warden_common_secret::SecretString;
use warden_server_audit::{actions, AuditCategory, AuditEntry, AuditService};
use warden_server_db::{SettingsStore, StoredSetting};

use crate::cache::SettingsCache;
use crate::cipher::SecretCipher;
use crate::error::{SecretsError, SecretsResult};

/// Keys that are always stored encrypted.
pub const SENSITIVE_SETTING_KEYS: &[&str] = &[
	"stripe_secret_key",
	"stripe_webhook_secret",
	"openai_api_key",
	"anthropic_api_key",
	"registrar_api_key",
	"registrar_api_secret",
	"hosting_api_token",
	"printful_api_key",
	"smtp_password",
];

const SENSITIVE_SUFFIXES: &[&str] = &["_secret", "_secret_key", "_api_key", "_password", "_token"];

/// Whether a setting must be encrypted regardless of what the caller asked for.
pub fn is_sensitive_setting(key: &str) -> bool {
	let key = key.to_ascii_lowercase();
	SENSITIVE_SETTING_KEYS.contains(&key.as_str())
		|| SENSITIVE_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
}

/// What admin surfaces may learn about a setting. Never the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingMetadata {
	pub key: String,
	pub is_set: bool,
	pub is_encrypted: bool,
	pub updated_at: Option<DateTime<Utc>>,
}

pub struct SettingsService {
	store: Arc<dyn SettingsStore>,
	cipher: Arc<SecretCipher>,
	cache: SettingsCache,
	audit: AuditService,
}

impl std::fmt::Debug for SettingsService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SettingsService")
			.field("cache", &self.cache)
			.finish_non_exhaustive()
	}
}

impl SettingsService {
	pub fn new(
		store: Arc<dyn SettingsStore>,
		cipher: Arc<SecretCipher>,
		audit: AuditService,
		cache_ttl: Duration,
	) -> Self {
		Self {
			store,
			cipher,
			cache: SettingsCache::new(cache_ttl),
			audit,
		}
	}

	/// Read a setting, decrypting when needed.
	///
	/// A value that fails its integrity check is reported as absent, logged,
	/// and audited. Database errors are returned.
	#[instrument(skip(self))]
	pub async fn get(&self, key: &str) -> SecretsResult<Option<SecretString>> {
		if let Some(cached) = self.cache.get(key).await {
			return Ok(cached);
		}

		// Taken before the read so a concurrent `set` keeps our stale row out
		// of the cache.
		let generation = self.cache.generation(key).await;
		let Some(stored) = self.store.get_setting(key).await? else {
			self.cache.insert(key, None, generation).await;
			return Ok(None);
		};

		let value = if stored.is_encrypted {
			match self.cipher.decrypt(&stored.value) {
				Ok(value) => Some(value),
				Err(_) => {
					tracing::error!(key = %key, "stored setting failed integrity check; treating as absent");
					self.audit.record(
						AuditEntry::builder(AuditCategory::Error, actions::SETTING_DECRYPT_FAILED)
							.description("stored setting failed integrity check")
							.error("integrity check failed")
							.meta("setting_key", key)
							.build(),
					);
					// Not cached, so a repaired row is picked up on the next read.
					return Ok(None);
				}
			}
		} else {
			Some(SecretString::new(stored.value))
		};

		self.cache.insert(key, value.clone(), generation).await;
		Ok(value)
	}

	/// Upsert a setting. Sensitive keys are encrypted whatever `encrypted` says.
	/// Returns whether the value was stored encrypted.
	#[instrument(skip(self, value), fields(requested_encryption = encrypted))]
	pub async fn set(&self, key: &str, value: &SecretString, encrypted: bool) -> SecretsResult<bool> {
		if key.trim().is_empty() {
			return Err(SecretsError::EmptyKey);
		}

		let encrypt = encrypted || is_sensitive_setting(key);
		if encrypt && !encrypted {
			tracing::debug!(key = %key, "sensitive setting forced to encrypted storage");
		}

		let stored_value = if encrypt {
			self.cipher.encrypt(value.expose())?
		} else {
			value.expose().clone()
		};

		self.store
			.upsert_setting(&StoredSetting {
				key: key.to_string(),
				value: stored_value,
				is_encrypted: encrypt,
				updated_at: Utc::now(),
			})
			.await?;
		self.cache.invalidate(key).await;

		tracing::info!(key = %key, encrypted = encrypt, "setting updated");
		Ok(encrypt)
	}

	#[instrument(skip(self))]
	pub async fn delete(&self, key: &str) -> SecretsResult<bool> {
		let removed = self.store.delete_setting(key).await?;
		self.cache.invalidate(key).await;
		if removed {
			tracing::info!(key = %key, "setting deleted");
		}
		Ok(removed)
	}

	/// Existence and storage mode of a setting, without decrypting it.
	#[instrument(skip(self))]
	pub async fn metadata(&self, key: &str) -> SecretsResult<SettingMetadata> {
		let stored = self.store.get_setting(key).await?;
		Ok(match stored {
			Some(s) => SettingMetadata {
				key: s.key,
				is_set: !s.value.is_empty(),
				is_encrypted: s.is_encrypted,
				updated_at: Some(s.updated_at),
			},
			None => SettingMetadata {
				key: key.to_string(),
				is_set: false,
				is_encrypted: is_sensitive_setting(key),
				updated_at: None,
			},
		})
	}

	pub async fn list_keys(&self) -> SecretsResult<Vec<String>> {
		Ok(self.store.list_setting_keys().await?)
	}
}
