// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use warden_server_db::DbError;

#[derive(Debug, Error)]
pub enum SecretsError {
	/// Stored ciphertext could not be decoded, authenticated, or read as UTF-8.
	/// Which step failed is not reported.
	#[error("stored value failed integrity check")]
	Integrity,

	#[error("encryption failed: {0}")]
	Encryption(String),

	#[error("key derivation failed: {0}")]
	KeyDerivation(String),

	#[error("settings key must not be empty")]
	EmptyKey,

	#[error("database error: {0}")]
	Database(#[from] DbError),

	#[error("key derivation task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}

pub type SecretsResult<T> = Result<T, SecretsError>;
