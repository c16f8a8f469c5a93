// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authenticated encryption for settings values.
//!
//! The key is derived once from the master secret with Argon2id and the
//! application salt. Each value gets a fresh random 96-bit nonce; the stored
//! form is `base64(nonce || ciphertext || tag)`.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use warden_common_secret::SecretString;
use zeroize::Zeroizing;

use crate::error::{SecretsError, SecretsResult};

/// Size of the derived key in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag length.
const TAG_SIZE: usize = 16;

/// Argon2id cost parameters for key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
	pub memory_kib: u32,
	pub iterations: u32,
	pub parallelism: u32,
}

impl Default for KdfParams {
	/// Same cost as password hashing: 64 MiB, 3 passes, 1 lane.
	fn default() -> Self {
		Self {
			memory_kib: 64 * 1024,
			iterations: 3,
			parallelism: 1,
		}
	}
}

/// AES-256-GCM cipher over a key derived from the master secret.
pub struct SecretCipher {
	key: Zeroizing<[u8; KEY_SIZE]>,
}

impl std::fmt::Debug for SecretCipher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SecretCipher").finish_non_exhaustive()
	}
}

impl SecretCipher {
	/// Derive the key synchronously. Slow; async callers use [`SecretCipher::derive`].
	pub fn new(master_secret: &SecretString, app_salt: &str, params: KdfParams) -> SecretsResult<Self> {
		let argon2_params = Params::new(
			params.memory_kib,
			params.iterations,
			params.parallelism,
			Some(KEY_SIZE),
		)
		.map_err(|e| SecretsError::KeyDerivation(e.to_string()))?;
		let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

		let mut key = Zeroizing::new([0u8; KEY_SIZE]);
		argon2
			.hash_password_into(
				master_secret.expose().as_bytes(),
				app_salt.as_bytes(),
				key.as_mut(),
			)
			.map_err(|e| SecretsError::KeyDerivation(e.to_string()))?;

		Ok(Self { key })
	}

	/// Derive the key on the blocking pool.
	#[tracing::instrument(skip_all, fields(memory_kib = params.memory_kib, iterations = params.iterations))]
	pub async fn derive(
		master_secret: SecretString,
		app_salt: String,
		params: KdfParams,
	) -> SecretsResult<Self> {
		let cipher =
			tokio::task::spawn_blocking(move || Self::new(&master_secret, &app_salt, params))
				.await??;
		tracing::debug!("settings encryption key derived");
		Ok(cipher)
	}

	fn aead(&self) -> Aes256Gcm {
		Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_slice()))
	}

	pub fn encrypt(&self, plaintext: &str) -> SecretsResult<String> {
		let mut nonce_bytes = [0u8; NONCE_SIZE];
		OsRng.fill_bytes(&mut nonce_bytes);
		let nonce = Nonce::from_slice(&nonce_bytes);

		let ciphertext = self
			.aead()
			.encrypt(nonce, plaintext.as_bytes())
			.map_err(|e| SecretsError::Encryption(e.to_string()))?;

		let mut stored = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
		stored.extend_from_slice(&nonce_bytes);
		stored.extend_from_slice(&ciphertext);
		Ok(STANDARD.encode(stored))
	}

	/// Every failure mode collapses to [`SecretsError::Integrity`].
	pub fn decrypt(&self, stored: &str) -> SecretsResult<SecretString> {
		let raw = STANDARD
			.decode(stored.trim())
			.map_err(|_| SecretsError::Integrity)?;
		if raw.len() < NONCE_SIZE + TAG_SIZE {
			return Err(SecretsError::Integrity);
		}
		let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);

		let plaintext = Zeroizing::new(
			self.aead()
				.decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
				.map_err(|_| SecretsError::Integrity)?,
		);
		let text = std::str::from_utf8(&plaintext).map_err(|_| SecretsError::Integrity)?;
		Ok(SecretString::new(text.to_string()))
	}
}

#[cfg(test)]
pub(crate) fn test_cipher(master: &str) -> SecretCipher {
	let params = KdfParams {
		memory_kib: 1024,
		iterations: 1,
		parallelism: 1,
	};
	SecretCipher::new(
		&SecretString::new(master.to_string()),
		"warden.settings.kdf.test",
		params,
	)
	.unwrap()
}
