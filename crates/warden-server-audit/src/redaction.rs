// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redaction and truncation applied to every entry before it reaches a sink.
//!
//! Redaction is key based: an object key whose normalized form (lowercase,
//! `-` and `_` removed) contains a sensitive word has its whole value replaced
//! with [`REDACTED`]. Nesting deeper than [`MAX_DEPTH`] is replaced as well.

use serde_json::Value;
use warden_server_config::AuditConfig;

use crate::event::AuditEntry;

pub const REDACTED: &str = "[REDACTED]";
pub const TRUNCATION_SUFFIX: &str = "...[truncated]";

const MAX_DEPTH: usize = 128;

/// Normalized forms. `password` also covers `password_hash`, `new_password`, etc.
const SENSITIVE_WORDS: &[&str] = &[
	"password",
	"passwd",
	"apikey",
	"token",
	"secret",
	"authorization",
	"cookie",
];

pub fn is_sensitive_key(key: &str) -> bool {
	let normalized: String = key
		.chars()
		.filter(|c| *c != '-' && *c != '_')
		.flat_map(char::to_lowercase)
		.collect();
	SENSITIVE_WORDS.iter().any(|word| normalized.contains(word))
}

/// Redact sensitive keys in place.
pub fn redact_json_value(value: &mut Value) {
	redact_json_value_with_depth(value, 0);
}

fn redact_json_value_with_depth(value: &mut Value, depth: usize) {
	if depth > MAX_DEPTH {
		*value = Value::String(REDACTED.to_string());
		return;
	}

	match value {
		Value::Array(items) => {
			for item in items {
				redact_json_value_with_depth(item, depth + 1);
			}
		}
		Value::Object(map) => {
			for (key, v) in map.iter_mut() {
				if is_sensitive_key(key) {
					*v = Value::String(REDACTED.to_string());
				} else {
					redact_json_value_with_depth(v, depth + 1);
				}
			}
		}
		_ => {}
	}
}

/// Redact `request_body` and `metadata` of an entry.
pub fn redact_entry(entry: &mut AuditEntry) {
	if let Some(body) = entry.request_body.as_mut() {
		redact_json_value(body);
	}
	redact_json_value(&mut entry.metadata);
}

/// Per-field character limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncationLimits {
	pub user_agent: usize,
	pub error_stack: usize,
	/// Applies to `description` and `error_message`.
	pub text: usize,
}

impl Default for TruncationLimits {
	fn default() -> Self {
		Self {
			user_agent: 512,
			error_stack: 8192,
			text: 2048,
		}
	}
}

impl From<&AuditConfig> for TruncationLimits {
	fn from(config: &AuditConfig) -> Self {
		Self {
			user_agent: config.max_user_agent_len,
			error_stack: config.max_stack_trace_len,
			text: config.max_text_len,
		}
	}
}

/// Keep the first `max_chars` characters and append [`TRUNCATION_SUFFIX`].
/// Cuts on a char boundary.
pub fn truncate_text(text: &mut String, max_chars: usize) {
	if let Some((byte_idx, _)) = text.char_indices().nth(max_chars) {
		text.truncate(byte_idx);
		text.push_str(TRUNCATION_SUFFIX);
	}
}

fn truncate_field(field: &mut Option<String>, max_chars: usize) {
	if let Some(text) = field.as_mut() {
		truncate_text(text, max_chars);
	}
}

pub fn truncate_entry(entry: &mut AuditEntry, limits: &TruncationLimits) {
	truncate_field(&mut entry.user_agent, limits.user_agent);
	truncate_field(&mut entry.error_stack, limits.error_stack);
	truncate_field(&mut entry.description, limits.text);
	truncate_field(&mut entry.error_message, limits.text);
}

/// Everything the pipeline does to an entry before publishing.
pub fn sanitize_entry(entry: &mut AuditEntry, limits: &TruncationLimits) {
	redact_entry(entry);
	truncate_entry(entry, limits);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::AuditCategory;
	use proptest::prelude::*;
	use serde_json::json;

	#[test]
	fn sensitive_keys_match_variants() {
		for key in [
			"password",
			"Password",
			"password_hash",
			"current_password",
			"new-password",
			"api_key",
			"apiKey",
			"api-key",
			"APIKEY",
			"token",
			"access_token",
			"refresh_token",
			"secret",
			"client_secret",
			"stripe_secret_key",
		] {
			assert!(is_sensitive_key(key), "{key}");
		}
	}

	#[test]
	fn ordinary_keys_are_kept() {
		for key in ["email", "target_user_id", "reason", "session_id", "key", "encrypted"] {
			assert!(!is_sensitive_key(key), "{key}");
		}
	}

	#[test]
	fn nested_values_are_redacted() {
		let mut value = json!({
			"email": "a@example.com",
			"credentials": {
				"password": "hunter2",
				"extra": [{"api_key": "sk-123"}, {"note": "fine"}]
			},
			"token": {"nested": "object"}
		});
		redact_json_value(&mut value);

		assert_eq!(value["email"], "a@example.com");
		assert_eq!(value["credentials"]["password"], REDACTED);
		assert_eq!(value["credentials"]["extra"][0]["api_key"], REDACTED);
		assert_eq!(value["credentials"]["extra"][1]["note"], "fine");
		assert_eq!(value["token"], REDACTED);
	}

	#[test]
	fn deep_nesting_is_replaced() {
		let mut value = json!("leaf");
		for _ in 0..(MAX_DEPTH + 10) {
			value = json!({ "a": value });
		}
		redact_json_value(&mut value);
		assert!(!value.to_string().contains("leaf"));
	}

	#[test]
	fn redact_entry_covers_body_and_metadata() {
		let mut entry = AuditEntry::builder(AuditCategory::User, "login")
			.request_body(json!({"email": "u@example.com", "password": "pw"}))
			.meta("refresh_token", "rt")
			.meta("reason", "ok")
			.build();
		redact_entry(&mut entry);

		let body = entry.request_body.unwrap();
		assert_eq!(body["password"], REDACTED);
		assert_eq!(body["email"], "u@example.com");
		assert_eq!(entry.metadata["refresh_token"], REDACTED);
		assert_eq!(entry.metadata["reason"], "ok");
	}

	#[test]
	fn truncate_is_char_boundary_safe() {
		let mut text = "é".repeat(10);
		truncate_text(&mut text, 4);
		assert_eq!(text, format!("éééé{TRUNCATION_SUFFIX}"));

		let mut short = "abc".to_string();
		truncate_text(&mut short, 3);
		assert_eq!(short, "abc");
	}

	#[test]
	fn truncate_entry_applies_limits() {
		let limits = TruncationLimits::default();
		let mut entry = AuditEntry::builder(AuditCategory::Error, "boom")
			.user_agent("u".repeat(600))
			.error("e".repeat(5000))
			.error_stack("s".repeat(9000))
			.build();
		truncate_entry(&mut entry, &limits);

		let ua = entry.user_agent.unwrap();
		assert_eq!(ua.chars().count(), 512 + TRUNCATION_SUFFIX.len());
		assert!(ua.ends_with(TRUNCATION_SUFFIX));
		assert!(entry.error_message.unwrap().starts_with(&"e".repeat(2048)));
		assert!(entry.error_stack.unwrap().ends_with(TRUNCATION_SUFFIX));
	}

	proptest! {
		#[test]
		fn truncated_text_never_exceeds_limit(text in "\\PC{0,300}", max in 0usize..200) {
			let mut t = text.clone();
			truncate_text(&mut t, max);
			let len = t.chars().count();
			if text.chars().count() > max {
				prop_assert_eq!(len, max + TRUNCATION_SUFFIX.chars().count());
			} else {
				prop_assert_eq!(t, text);
			}
		}

		#[test]
		fn sensitive_values_never_survive(value in "[a-z0-9]{8,32}", key in "(password|api_key|token|secret)") {
			let mut doc = json!({ "outer": [{ key.clone(): value.clone() }] });
			redact_json_value(&mut doc);
			prop_assert_eq!(&doc["outer"][0][key.as_str()], &json!(REDACTED));
		}
	}
}
