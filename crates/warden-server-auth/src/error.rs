// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the credential service.
//!
//! Token verification does not use these: it returns `Option` so every
//! failure looks the same to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
	// =========================================================================
	// Authentication & Authorization
	// =========================================================================
	/// Uniform authentication failure. Never says which check failed.
	#[error("unauthorized")]
	Unauthorized,

	/// Authenticated, but the role is insufficient for the action.
	#[error("forbidden: {0}")]
	Forbidden(String),

	// =========================================================================
	// Internal
	// =========================================================================
	#[error("password hashing failed: {0}")]
	Hashing(String),

	#[error("token signing failed: {0}")]
	Signing(String),

	#[error("blocking task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}

impl AuthError {
	/// Errors whose detail must stay in the logs.
	pub fn is_internal(&self) -> bool {
		matches!(
			self,
			AuthError::Hashing(_) | AuthError::Signing(_) | AuthError::Join(_)
		)
	}

	pub fn status_code(&self) -> http::StatusCode {
		match self {
			AuthError::Unauthorized => http::StatusCode::UNAUTHORIZED,
			AuthError::Forbidden(_) => http::StatusCode::FORBIDDEN,
			_ => http::StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_codes() {
		assert_eq!(AuthError::Unauthorized.status_code(), 401);
		assert_eq!(AuthError::Forbidden("x".into()).status_code(), 403);
		assert_eq!(AuthError::Hashing("x".into()).status_code(), 500);
	}

	#[test]
	fn unauthorized_message_has_no_detail() {
		assert_eq!(AuthError::Unauthorized.to_string(), "unauthorized");
		assert!(!AuthError::Unauthorized.is_internal());
		assert!(AuthError::Signing("bad key".into()).is_internal());
	}
}
