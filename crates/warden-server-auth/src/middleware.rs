// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential extraction from request headers.
//!
//! A request carries at most one bearer token. The `Authorization: Bearer`
//! header wins over the session cookie when both are present. Values are
//! returned wrapped in [`SecretString`] and never logged.

use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;
use tracing::instrument;
use warden_common_secret::SecretString;

/// Extract a cookie value by name from the `Cookie` header.
pub fn extract_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(';'))
		.find_map(|cookie| {
			let (name, value) = cookie.trim().split_once('=')?;
			if name == cookie_name && !value.is_empty() {
				Some(value.to_string())
			} else {
				None
			}
		})
}

/// Extract the token from `Authorization: Bearer <token>`.
#[instrument(level = "trace", skip_all)]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<SecretString> {
	let auth_str = headers.get(AUTHORIZATION)?.to_str().ok()?;
	let token = auth_str.strip_prefix("Bearer ")?.trim();
	if token.is_empty() {
		return None;
	}
	Some(SecretString::new(token.to_string()))
}

/// Bearer header first, then the named session cookie.
pub fn extract_credential(headers: &HeaderMap, session_cookie_name: &str) -> Option<SecretString> {
	extract_bearer_token(headers)
		.or_else(|| extract_cookie(headers, session_cookie_name).map(SecretString::new))
}
