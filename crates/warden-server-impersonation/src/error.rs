// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use warden_server_auth::AuthError;
use warden_server_db::DbError;

#[derive(Debug, Error)]
pub enum ImpersonationError {
	/// The caller may not impersonate, or may not end this session.
	#[error("forbidden")]
	Forbidden,

	#[error("target user not found")]
	TargetNotFound,

	#[error("operator already has an open impersonation session")]
	AlreadyImpersonating,

	#[error("impersonation session not found")]
	SessionNotFound,

	#[error("database error: {0}")]
	Database(#[from] DbError),

	#[error("token error: {0}")]
	Token(#[from] AuthError),
}

impl ImpersonationError {
	pub fn is_internal(&self) -> bool {
		matches!(
			self,
			ImpersonationError::Database(_) | ImpersonationError::Token(_)
		)
	}
}

pub type ImpersonationResult<T> = Result<T, ImpersonationError>;
