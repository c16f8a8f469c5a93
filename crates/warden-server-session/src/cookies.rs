// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `Set-Cookie` values for the session and the impersonation indicator.
//!
//! The session cookie is `HttpOnly`. The indicator is readable by scripts so
//! the UI can show a banner; it holds only the impersonation session id and
//! grants nothing.

use warden_common_secret::SecretString;
use warden_server_config::AuthConfig;

pub const DEFAULT_SESSION_COOKIE_NAME: &str = "warden_session";
pub const DEFAULT_IMPERSONATION_COOKIE_NAME: &str = "warden_impersonating";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
	pub session_name: String,
	pub indicator_name: String,
	pub secure: bool,
}

impl Default for CookieSettings {
	fn default() -> Self {
		Self {
			session_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
			indicator_name: DEFAULT_IMPERSONATION_COOKIE_NAME.to_string(),
			secure: true,
		}
	}
}

impl From<&AuthConfig> for CookieSettings {
	fn from(config: &AuthConfig) -> Self {
		Self {
			session_name: config.session_cookie_name.clone(),
			indicator_name: config.impersonation_cookie_name.clone(),
			secure: config.cookie_secure,
		}
	}
}

impl CookieSettings {
	/// Session cookie lasting as long as the token.
	pub fn session_cookie(&self, token: &SecretString, max_age_secs: i64) -> String {
		self.build(&self.session_name, token.expose(), max_age_secs, true)
	}

	pub fn clear_session_cookie(&self) -> String {
		self.build(&self.session_name, "", 0, true)
	}

	pub fn impersonation_indicator_cookie(&self, session_id: &str, max_age_secs: i64) -> String {
		self.build(&self.indicator_name, session_id, max_age_secs, false)
	}

	pub fn clear_impersonation_indicator_cookie(&self) -> String {
		self.build(&self.indicator_name, "", 0, false)
	}

	fn build(&self, name: &str, value: &str, max_age_secs: i64, http_only: bool) -> String {
		let mut cookie = format!(
			"{name}={value}; Path=/; Max-Age={}",
			max_age_secs.max(0)
		);
		if http_only {
			cookie.push_str("; HttpOnly");
		}
		cookie.push_str("; SameSite=Lax");
		if self.secure {
			cookie.push_str("; Secure");
		}
		cookie
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn settings(secure: bool) -> CookieSettings {
		CookieSettings {
			secure,
			..Default::default()
		}
	}

	#[test]
	fn session_cookie_attributes() {
		let cookie = settings(true).session_cookie(&SecretString::new("abc.def".to_string()), 3600);
		assert_eq!(
			cookie,
			"warden_session=abc.def; Path=/; Max-Age=3600; HttpOnly; SameSite=Lax; Secure"
		);
	}

	#[test]
	fn insecure_in_development() {
		let cookie = settings(false).session_cookie(&SecretString::new("t".to_string()), 60);
		assert!(!cookie.contains("Secure"));
		assert!(cookie.contains("HttpOnly"));
	}

	#[test]
	fn indicator_is_script_readable() {
		let cookie = settings(true).impersonation_indicator_cookie("b7c1", 7200);
		assert!(cookie.starts_with("warden_impersonating=b7c1;"));
		assert!(!cookie.contains("HttpOnly"));
		assert!(cookie.contains("Max-Age=7200"));
	}

	#[test]
	fn clearing_expires_immediately() {
		let s = settings(false);
		assert_eq!(
			s.clear_session_cookie(),
			"warden_session=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"
		);
		assert_eq!(
			s.clear_impersonation_indicator_cookie(),
			"warden_impersonating=; Path=/; Max-Age=0; SameSite=Lax"
		);
	}

	#[test]
	fn names_follow_config() {
		let config = AuthConfig {
			session_cookie_name: "sid".to_string(),
			impersonation_cookie_name: "imp".to_string(),
			cookie_secure: false,
			..Default::default()
		};
		let s = CookieSettings::from(&config);
		assert!(s.clear_session_cookie().starts_with("sid="));
		assert!(s.clear_impersonation_indicator_cookie().starts_with("imp="));
		assert!(!s.secure);
	}
}
