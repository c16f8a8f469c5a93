// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.
//!
//! 401 and 403 bodies never say which check failed. Internal errors are
//! logged with their detail and answered with a generic 500.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use warden_server_auth::AuthError;
use warden_server_config::ConfigError;
use warden_server_db::DbError;
use warden_server_impersonation::ImpersonationError;
use warden_server_secrets::SecretsError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("unauthorized")]
	Unauthorized,

	#[error("forbidden")]
	Forbidden,

	#[error("Invalid request: {0}")]
	BadRequest(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal error: {0}")]
	Internal(String),

	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("Secrets error: {0}")]
	Secrets(#[from] SecretsError),

	#[error("Auth error: {0}")]
	Auth(#[from] AuthError),

	#[error("Impersonation error: {0}")]
	Impersonation(#[from] ImpersonationError),

	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl ErrorResponse {
	fn bare(error: &str) -> Self {
		Self {
			error: error.to_string(),
			message: None,
		}
	}

	fn with_message(error: &str, message: impl Into<String>) -> Self {
		Self {
			error: error.to_string(),
			message: Some(message.into()),
		}
	}
}

impl ServerError {
	fn internal(detail: &dyn std::fmt::Display) -> (StatusCode, ErrorResponse) {
		tracing::error!(error = %detail, "internal error");
		(
			StatusCode::INTERNAL_SERVER_ERROR,
			ErrorResponse::with_message("internal_error", "An internal error occurred"),
		)
	}

	fn parts(&self) -> (StatusCode, ErrorResponse) {
		match self {
			ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, ErrorResponse::bare("unauthorized")),
			ServerError::Forbidden => (StatusCode::FORBIDDEN, ErrorResponse::bare("forbidden")),
			ServerError::BadRequest(msg) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse::with_message("bad_request", msg.clone()),
			),
			ServerError::NotFound(msg) => (
				StatusCode::NOT_FOUND,
				ErrorResponse::with_message("not_found", msg.clone()),
			),
			ServerError::Conflict(msg) => (
				StatusCode::CONFLICT,
				ErrorResponse::with_message("conflict", msg.clone()),
			),
			ServerError::Secrets(SecretsError::EmptyKey) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse::with_message("bad_request", "setting key must not be empty"),
			),
			ServerError::Auth(AuthError::Forbidden(_)) => {
				(StatusCode::FORBIDDEN, ErrorResponse::bare("forbidden"))
			}
			ServerError::Auth(AuthError::Unauthorized) => {
				(StatusCode::UNAUTHORIZED, ErrorResponse::bare("unauthorized"))
			}
			ServerError::Impersonation(e) => match e {
				ImpersonationError::Forbidden => {
					(StatusCode::FORBIDDEN, ErrorResponse::bare("forbidden"))
				}
				ImpersonationError::TargetNotFound => (
					StatusCode::NOT_FOUND,
					ErrorResponse::with_message("not_found", "user not found"),
				),
				ImpersonationError::SessionNotFound => (
					StatusCode::NOT_FOUND,
					ErrorResponse::with_message("not_found", "impersonation session not found"),
				),
				ImpersonationError::AlreadyImpersonating => (
					StatusCode::CONFLICT,
					ErrorResponse::with_message(
						"conflict",
						"Already impersonating another user. Stop current impersonation first.",
					),
				),
				other => Self::internal(other),
			},
			ServerError::Internal(detail) => Self::internal(detail),
			ServerError::Db(e) => Self::internal(e),
			ServerError::Secrets(e) => Self::internal(e),
			ServerError::Auth(e) => Self::internal(e),
			ServerError::Config(e) => Self::internal(e),
		}
	}

	pub fn status_code(&self) -> StatusCode {
		match self {
			ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
			ServerError::Forbidden => StatusCode::FORBIDDEN,
			ServerError::BadRequest(_) | ServerError::Secrets(SecretsError::EmptyKey) => {
				StatusCode::BAD_REQUEST
			}
			ServerError::NotFound(_)
			| ServerError::Impersonation(ImpersonationError::TargetNotFound)
			| ServerError::Impersonation(ImpersonationError::SessionNotFound) => StatusCode::NOT_FOUND,
			ServerError::Conflict(_)
			| ServerError::Impersonation(ImpersonationError::AlreadyImpersonating) => {
				StatusCode::CONFLICT
			}
			ServerError::Impersonation(ImpersonationError::Forbidden) => StatusCode::FORBIDDEN,
			ServerError::Auth(AuthError::Unauthorized) => StatusCode::UNAUTHORIZED,
			ServerError::Auth(AuthError::Forbidden(_)) => StatusCode::FORBIDDEN,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = self.parts();
		(status, Json(body)).into_response()
	}
}
