// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP handlers.

pub mod audit_logs;
pub mod auth;
pub mod health;
pub mod impersonation;
pub mod settings;

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

use crate::error::ServerError;

/// Append `Set-Cookie` headers. Cookie values are built from tokens and ids
/// that are always valid header text.
pub(crate) fn set_cookies(cookies: &[String]) -> Result<HeaderMap, ServerError> {
	let mut headers = HeaderMap::new();
	for cookie in cookies {
		let value = HeaderValue::from_str(cookie)
			.map_err(|e| ServerError::Internal(format!("invalid cookie header: {e}")))?;
		headers.append(SET_COOKIE, value);
	}
	Ok(headers)
}
