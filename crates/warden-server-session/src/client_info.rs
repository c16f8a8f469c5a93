// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Origin of a request, for audit entries and impersonation rows.

use http::header::USER_AGENT;
use http::HeaderMap;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}

impl ClientInfo {
	/// Reads `X-Forwarded-For` (first hop), then `X-Real-IP`, then
	/// `CF-Connecting-IP`. These headers are only trustworthy behind a proxy
	/// that overwrites them.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		Self {
			ip_address: client_ip(headers),
			user_agent: header_str(headers, USER_AGENT.as_str()),
		}
	}
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get(name)
		.and_then(|v| v.to_str().ok())
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(str::to_string)
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
	if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
		if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
			return Some(first.to_string());
		}
	}
	header_str(headers, "x-real-ip").or_else(|| header_str(headers, "cf-connecting-ip"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::HeaderValue;

	fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
		let mut map = HeaderMap::new();
		for (name, value) in pairs {
			map.insert(*name, HeaderValue::from_str(value).unwrap());
		}
		map
	}

	#[test]
	fn forwarded_for_first_hop_wins() {
		let info = ClientInfo::from_headers(&headers(&[
			("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
			("x-real-ip", "10.0.0.2"),
			("user-agent", "curl/8.0"),
		]));
		assert_eq!(info.ip_address.as_deref(), Some("203.0.113.7"));
		assert_eq!(info.user_agent.as_deref(), Some("curl/8.0"));
	}

	#[test]
	fn falls_back_through_headers() {
		let info = ClientInfo::from_headers(&headers(&[("x-real-ip", "198.51.100.4")]));
		assert_eq!(info.ip_address.as_deref(), Some("198.51.100.4"));

		let info = ClientInfo::from_headers(&headers(&[("cf-connecting-ip", "2001:db8::1")]));
		assert_eq!(info.ip_address.as_deref(), Some("2001:db8::1"));
	}

	#[test]
	fn nothing_known() {
		assert_eq!(ClientInfo::from_headers(&HeaderMap::new()), ClientInfo::default());
		let info = ClientInfo::from_headers(&headers(&[("x-forwarded-for", " , ")]));
		assert!(info.ip_address.is_none());
	}
}
