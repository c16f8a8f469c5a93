// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication configuration: token signing, lifetimes, cookies.

use serde::Deserialize;
use warden_common_secret::SecretString;

pub const DEFAULT_USER_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;
pub const DEFAULT_OPERATOR_TOKEN_TTL_SECS: u64 = 8 * 60 * 60;
pub const DEFAULT_IMPERSONATION_TOKEN_TTL_SECS: u64 = 2 * 60 * 60;
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 5;

/// Authentication configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct AuthConfig {
	pub dev_mode: bool,
	pub environment: String,
	/// HMAC key for bearer tokens. Required; checked by `validate_config`.
	pub token_signing_key: Option<SecretString>,
	pub user_token_ttl_secs: u64,
	pub operator_token_ttl_secs: u64,
	pub impersonation_token_ttl_secs: u64,
	pub clock_skew_secs: u64,
	pub session_cookie_name: String,
	pub impersonation_cookie_name: String,
	/// Adds `Secure` to issued cookies.
	pub cookie_secure: bool,
	/// Upper bound on concurrent Argon2 hash/verify jobs.
	pub password_hash_concurrency: usize,
}

impl AuthConfig {
	pub fn is_production(&self) -> bool {
		self.environment.eq_ignore_ascii_case("production")
	}
}

impl Default for AuthConfig {
	fn default() -> Self {
		AuthConfigLayer::default().finalize()
	}
}

/// Authentication configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub dev_mode: Option<bool>,
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub token_signing_key: Option<SecretString>,
	#[serde(default)]
	pub user_token_ttl_secs: Option<u64>,
	#[serde(default)]
	pub operator_token_ttl_secs: Option<u64>,
	#[serde(default)]
	pub impersonation_token_ttl_secs: Option<u64>,
	#[serde(default)]
	pub clock_skew_secs: Option<u64>,
	#[serde(default)]
	pub session_cookie_name: Option<String>,
	#[serde(default)]
	pub impersonation_cookie_name: Option<String>,
	#[serde(default)]
	pub cookie_secure: Option<bool>,
	#[serde(default)]
	pub password_hash_concurrency: Option<usize>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.dev_mode.is_some() {
			self.dev_mode = other.dev_mode;
		}
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		if other.token_signing_key.is_some() {
			self.token_signing_key = other.token_signing_key;
		}
		if other.user_token_ttl_secs.is_some() {
			self.user_token_ttl_secs = other.user_token_ttl_secs;
		}
		if other.operator_token_ttl_secs.is_some() {
			self.operator_token_ttl_secs = other.operator_token_ttl_secs;
		}
		if other.impersonation_token_ttl_secs.is_some() {
			self.impersonation_token_ttl_secs = other.impersonation_token_ttl_secs;
		}
		if other.clock_skew_secs.is_some() {
			self.clock_skew_secs = other.clock_skew_secs;
		}
		if other.session_cookie_name.is_some() {
			self.session_cookie_name = other.session_cookie_name;
		}
		if other.impersonation_cookie_name.is_some() {
			self.impersonation_cookie_name = other.impersonation_cookie_name;
		}
		if other.cookie_secure.is_some() {
			self.cookie_secure = other.cookie_secure;
		}
		if other.password_hash_concurrency.is_some() {
			self.password_hash_concurrency = other.password_hash_concurrency;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		let dev_mode = self.dev_mode.unwrap_or(false);
		AuthConfig {
			dev_mode,
			environment: self
				.environment
				.unwrap_or_else(|| "development".to_string()),
			token_signing_key: self.token_signing_key,
			user_token_ttl_secs: self
				.user_token_ttl_secs
				.unwrap_or(DEFAULT_USER_TOKEN_TTL_SECS),
			operator_token_ttl_secs: self
				.operator_token_ttl_secs
				.unwrap_or(DEFAULT_OPERATOR_TOKEN_TTL_SECS),
			impersonation_token_ttl_secs: self
				.impersonation_token_ttl_secs
				.unwrap_or(DEFAULT_IMPERSONATION_TOKEN_TTL_SECS),
			clock_skew_secs: self.clock_skew_secs.unwrap_or(DEFAULT_CLOCK_SKEW_SECS),
			session_cookie_name: self
				.session_cookie_name
				.unwrap_or_else(|| "warden_session".to_string()),
			impersonation_cookie_name: self
				.impersonation_cookie_name
				.unwrap_or_else(|| "warden_impersonating".to_string()),
			cookie_secure: self.cookie_secure.unwrap_or(!dev_mode),
			password_hash_concurrency: self.password_hash_concurrency.unwrap_or(4).max(1),
		}
	}
}
