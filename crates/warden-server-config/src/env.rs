// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret loading with the `VAR` / `VAR_FILE` convention.
//!
//! Key material is usually mounted as a file (Docker or Kubernetes secrets), so
//! `WARDEN_SERVER_TOKEN_SIGNING_KEY_FILE=/run/secrets/signing_key` takes
//! precedence over `WARDEN_SERVER_TOKEN_SIGNING_KEY`.

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;
use warden_common_secret::SecretString;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret from `{var}_FILE` (file contents, one trailing newline
/// stripped) or `{var}` (value). Returns `Ok(None)` when neither is set or the
/// direct value is empty.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
			path: path.clone(),
			source: e,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(secret)));
	}

	match env::var(var) {
		Ok(value) if !value.is_empty() => Ok(Some(SecretString::new(value))),
		_ => Ok(None),
	}
}
