// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password hashing with Argon2id.
//!
//! [`hash_password`] and [`verify_password`] are CPU-bound and slow on purpose.
//! Request handlers should go through [`PasswordHasher`], which runs them on the
//! blocking pool behind a semaphore so a burst of logins cannot starve the
//! async workers.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{PasswordHasher as _, PasswordVerifier as _};
use tokio::sync::Semaphore;
use tracing::instrument;
use warden_common_secret::SecretString;

use crate::argon2_config::argon2_instance;
use crate::error::AuthError;

/// Hash a password into a PHC string (`$argon2id$v=19$...`) with a fresh salt.
pub fn hash_password(plaintext: &str) -> Result<String, AuthError> {
	let salt = SaltString::generate(&mut OsRng);
	argon2_instance()
		.hash_password(plaintext.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC string.
///
/// Comparison is left to the argon2 crate. A malformed hash yields `false`.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
	let parsed = match PasswordHash::new(hash) {
		Ok(h) => h,
		Err(_) => return false,
	};
	argon2_instance()
		.verify_password(plaintext.as_bytes(), &parsed)
		.is_ok()
}

/// Bounded async front for the Argon2 functions.
#[derive(Clone)]
pub struct PasswordHasher {
	permits: Arc<Semaphore>,
}

impl PasswordHasher {
	pub fn new(max_concurrent: usize) -> Self {
		Self {
			permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
		}
	}

	#[instrument(level = "debug", skip_all)]
	pub async fn hash(&self, plaintext: SecretString) -> Result<String, AuthError> {
		let _permit = self
			.permits
			.acquire()
			.await
			.map_err(|e| AuthError::Hashing(e.to_string()))?;
		tokio::task::spawn_blocking(move || hash_password(plaintext.expose())).await?
	}

	/// Returns `false` for a wrong password, a malformed hash, or an internal
	/// failure; the last is logged.
	#[instrument(level = "debug", skip_all)]
	pub async fn verify(&self, plaintext: SecretString, hash: String) -> bool {
		let _permit = match self.permits.acquire().await {
			Ok(permit) => permit,
			Err(e) => {
				tracing::error!(error = %e, "password hasher semaphore closed");
				return false;
			}
		};
		match tokio::task::spawn_blocking(move || verify_password(plaintext.expose(), &hash)).await {
			Ok(valid) => valid,
			Err(e) => {
				tracing::error!(error = %e, "password verification task failed");
				false
			}
		}
	}

	pub fn available_permits(&self) -> usize {
		self.permits.available_permits()
	}
}

impl std::fmt::Debug for PasswordHasher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PasswordHasher")
			.field("available_permits", &self.available_permits())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn hash_is_argon2id_phc_string() {
		let hash = hash_password("correct horse battery staple").unwrap();
		assert!(hash.starts_with("$argon2id$"));
		assert!(!hash.contains("correct horse"));
	}

	#[test]
	fn same_password_hashes_differently() {
		assert_ne!(hash_password("pw").unwrap(), hash_password("pw").unwrap());
	}

	#[test]
	fn verify_accepts_correct_and_rejects_wrong() {
		let hash = hash_password("hunter22").unwrap();
		assert!(verify_password("hunter22", &hash));
		assert!(!verify_password("hunter23", &hash));
	}

	#[test]
	fn malformed_hash_is_false_not_panic() {
		assert!(!verify_password("pw", ""));
		assert!(!verify_password("pw", "not-a-phc-string"));
		assert!(!verify_password("pw", "$argon2id$v=19$m=1024,t=1,p=1$broken"));
	}

	#[tokio::test]
	async fn hasher_roundtrip() {
		let hasher = PasswordHasher::new(2);
		let hash = hasher.hash("s3cret-pass".into()).await.unwrap();
		assert!(hasher.verify("s3cret-pass".into(), hash.clone()).await);
		assert!(!hasher.verify("s3cret-pasS".into(), hash).await);
		assert_eq!(hasher.available_permits(), 2);
	}

	#[tokio::test]
	async fn hasher_verify_malformed_is_false() {
		let hasher = PasswordHasher::new(1);
		assert!(!hasher.verify("pw".into(), "garbage".to_string()).await);
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(16))]

		#[test]
		fn single_char_mutation_fails(
			password in "[a-zA-Z0-9]{1,24}",
			index in any::<prop::sample::Index>(),
			replacement in "[a-zA-Z0-9!@#]",
		) {
			let hash = hash_password(&password).unwrap();
			prop_assert!(verify_password(&password, &hash));

			let mut chars: Vec<char> = password.chars().collect();
			let i = index.index(chars.len());
			let new_char = replacement.chars().next().unwrap();
			prop_assume!(chars[i] != new_char);
			chars[i] = new_char;
			let mutated: String = chars.into_iter().collect();
			prop_assert!(!verify_password(&mutated, &hash));
		}
	}
}
